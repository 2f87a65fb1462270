//! Instance resolution.
//!
//! # Data Flow
//! ```text
//! resolve(service)
//!     → registry lookup (full template list)
//!     → advance per-service round-robin cursor (lazy wrap)
//!     → replica.rs (template → concrete address)
//! ```
//!
//! # Design Decisions
//! - Cursors are process-lifetime state, never persisted
//! - Wrap is corrected lazily on the next call, not at increment time
//! - Fairness under concurrent resolution is best-effort

pub mod replica;

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::Result;
use crate::registry::ServiceRegistry;
use crate::resolver::replica::ReplicaNaming;

pub use replica::{PassthroughNaming, PortDigitNaming};

/// Picks a concrete instance address per request.
pub struct InstanceResolver {
    registry: Arc<ServiceRegistry>,
    naming: Arc<dyn ReplicaNaming>,
    cursors: DashMap<String, usize>,
}

impl InstanceResolver {
    pub fn new(registry: Arc<ServiceRegistry>, naming: Arc<dyn ReplicaNaming>) -> Self {
        Self {
            registry,
            naming,
            cursors: DashMap::new(),
        }
    }

    /// Resolve the next concrete instance address for a service, advancing
    /// the round-robin cursor. Propagates `NotFound` from the registry.
    pub async fn resolve(&self, service_name: &str) -> Result<String> {
        let templates = self.registry.lookup(service_name).await?;

        let template = {
            let mut entry = self.cursors.entry(service_name.to_string()).or_insert(0);
            let mut cursor = *entry;
            if cursor >= templates.len() {
                cursor = 0;
            }
            *entry = cursor + 1;
            templates[cursor].clone()
        };

        let address = self.naming.concrete_address(service_name, &template);
        tracing::debug!(
            service = %service_name,
            template = %template,
            address = %address,
            "Resolved instance"
        );
        Ok(address)
    }

    /// The concrete address the next `resolve` call would yield, without
    /// advancing the cursor. Debug surface only.
    pub async fn peek(&self, service_name: &str) -> Result<String> {
        let templates = self.registry.lookup(service_name).await?;

        let mut cursor = self.cursors.get(service_name).map(|c| *c).unwrap_or(0);
        if cursor >= templates.len() {
            cursor = 0;
        }

        Ok(self
            .naming
            .concrete_address(service_name, &templates[cursor]))
    }

    /// Apply the naming transform to an arbitrary template. Used by the
    /// health monitor, which probes every instance rather than one pick.
    pub fn transform(&self, service_name: &str, template: &str) -> String {
        self.naming.concrete_address(service_name, template)
    }
}
