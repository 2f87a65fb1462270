//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Registry store connection settings.
    pub registry: RegistryConfig,

    /// Logical service names the gateway fronts.
    pub services: ServicesConfig,

    /// Instance resolution settings.
    pub resolver: ResolverConfig,

    /// Retry and circuit breaker settings.
    pub resilience: ResilienceConfig,

    /// Admission control settings.
    pub admission: AdmissionConfig,

    /// Transaction coordination settings.
    pub transaction: TransactionConfig,

    /// Health probe settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Registry store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Store connection URL.
    pub url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
        }
    }
}

/// Logical services known to the gateway.
///
/// The store has no key-scan operation, so the health monitor and the
/// dispatch surface work from this list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Service names, in probe order.
    pub names: Vec<String>,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            names: vec!["battleship".to_string(), "profile".to_string()],
        }
    }
}

/// Instance resolution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Replica naming strategy: "port-digit" or "passthrough".
    pub replica_naming: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            replica_naming: "port-digit".to_string(),
        }
    }
}

/// Retry and circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Bounded attempts per instance.
    pub retry_limit: u32,

    /// Maximum distinct instance attempts per call.
    pub max_instance_attempts: u32,

    /// Circuit breaker open window in seconds.
    pub circuit_breaker_timeout_secs: u64,

    /// Timeout applied to every outbound call, in seconds.
    pub per_call_timeout_secs: u64,

    /// Base delay for backoff between retries, in milliseconds.
    pub backoff_base_ms: u64,

    /// Maximum backoff delay in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            retry_limit: 3,
            max_instance_attempts: 3,
            circuit_breaker_timeout_secs: 60,
            per_call_timeout_secs: 5,
            backoff_base_ms: 100,
            backoff_max_ms: 2000,
        }
    }
}

/// Admission control configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum in-flight requests before rejection.
    pub concurrent_task_limit: usize,

    /// Request-rate sampling interval in milliseconds.
    pub sample_interval_ms: u64,

    /// Sampled request count above which an overload signal is emitted.
    pub overload_threshold: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            concurrent_task_limit: 100,
            sample_interval_ms: 1000,
            overload_threshold: 500,
        }
    }
}

/// Transaction coordination configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// The two participant service names.
    pub participants: Vec<String>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            participants: vec!["battleship".to_string(), "profile".to_string()],
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable background health probes.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,

    /// Path to probe on each instance.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 20,
            timeout_secs: 5,
            path: "/status".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the /metrics exposition route.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}
