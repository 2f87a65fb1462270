//! Per-instance circuit breaker.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: instance assumed down, calls skip it until the window elapses
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count reaches retry_limit
//! Open → Closed: open window elapsed (eager full reset, no half-open probe)
//! ```
//!
//! Keyed by the resolved concrete address, not the template. Updates are
//! serialized per address through the map's entry locks.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::observability::metrics;

#[derive(Debug, Default)]
struct AddressState {
    failure_count: u32,
    opened_at: Option<Instant>,
}

/// Tracks failure counts and open windows per concrete address.
#[derive(Debug)]
pub struct CircuitBreaker {
    retry_limit: u32,
    open_window: Duration,
    states: DashMap<String, AddressState>,
}

impl CircuitBreaker {
    pub fn new(retry_limit: u32, open_window: Duration) -> Self {
        Self {
            retry_limit,
            open_window,
            states: DashMap::new(),
        }
    }

    /// Whether calls to this address should be skipped. An open circuit
    /// whose window has elapsed is reset to Closed with a zero failure
    /// count before returning.
    pub fn is_open(&self, address: &str) -> bool {
        let Some(mut state) = self.states.get_mut(address) else {
            return false;
        };
        match state.opened_at {
            Some(opened_at) if opened_at.elapsed() < self.open_window => true,
            Some(_) => {
                state.opened_at = None;
                state.failure_count = 0;
                tracing::info!(address = %address, "Circuit re-closed after open window");
                metrics::record_circuit_transition(address, "closed");
                false
            }
            None => false,
        }
    }

    /// Current failure count for the address.
    pub fn failure_count(&self, address: &str) -> u32 {
        self.states
            .get(address)
            .map(|state| state.failure_count)
            .unwrap_or(0)
    }

    /// Record a successful call; resets the failure count.
    pub fn record_success(&self, address: &str) {
        if let Some(mut state) = self.states.get_mut(address) {
            state.failure_count = 0;
        }
    }

    /// Record a failed call. Returns true when this failure opened the
    /// circuit.
    pub fn record_failure(&self, address: &str) -> bool {
        let mut state = self.states.entry(address.to_string()).or_default();
        state.failure_count += 1;
        if state.failure_count >= self.retry_limit && state.opened_at.is_none() {
            state.opened_at = Some(Instant::now());
            tracing::warn!(
                address = %address,
                failures = state.failure_count,
                "Circuit opened"
            );
            metrics::record_circuit_transition(address, "open");
            true
        } else {
            false
        }
    }
}
