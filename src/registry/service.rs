//! Service registration and lookup.

use std::sync::Arc;

use crate::error::{GatewayError, Result};
use crate::observability::metrics;
use crate::registry::store::RegistryStore;

/// Healthy registry status with the store's liveness token.
#[derive(Debug, Clone)]
pub struct RegistryStatus {
    pub message: String,
    pub store_token: String,
}

/// Owns registration and lookup against the registry store.
pub struct ServiceRegistry {
    store: Arc<dyn RegistryStore>,
}

impl ServiceRegistry {
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self { store }
    }

    /// Append an instance address under a logical service name.
    ///
    /// A key left behind by the legacy scalar format is deleted and
    /// re-initialized as a list before the append.
    pub async fn register(&self, service_name: &str, address: &str) -> Result<()> {
        if service_name.is_empty() || address.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "service name and address required".into(),
            ));
        }
        if url::Url::parse(address).is_err() {
            return Err(GatewayError::InvalidArgument(format!(
                "address '{}' is not a valid URL",
                address
            )));
        }

        if self.store.exists(service_name).await? {
            let ty = self.store.type_of(service_name).await?;
            if ty == "string" {
                tracing::info!(
                    service = %service_name,
                    "Migrating legacy scalar registration to list"
                );
                self.store.delete(service_name).await?;
            } else if ty != "list" {
                return Err(GatewayError::InvalidArgument(format!(
                    "key '{}' already exists and is of type '{}'",
                    service_name, ty
                )));
            }
        }

        self.store.append(service_name, address).await?;
        metrics::record_service_registered(service_name);

        tracing::info!(
            service = %service_name,
            address = %address,
            "Service instance registered"
        );
        Ok(())
    }

    /// Return the full ordered instance list for a service.
    pub async fn lookup(&self, service_name: &str) -> Result<Vec<String>> {
        let addresses = self.store.range(service_name).await?;
        if addresses.is_empty() {
            return Err(GatewayError::NotFound(service_name.to_string()));
        }
        Ok(addresses)
    }

    /// Probe the underlying store.
    pub async fn status(&self) -> Result<RegistryStatus> {
        match self.store.ping().await {
            Ok(token) => Ok(RegistryStatus {
                message: "Service registry is healthy".into(),
                store_token: token,
            }),
            Err(e) => Err(GatewayError::Unavailable(format!(
                "registry store unreachable: {}",
                e
            ))),
        }
    }
}
