//! Configuration validation.
//!
//! Serde handles syntactic checks; this module covers semantic ones.
//! All violations are returned at once, not just the first.

use crate::config::schema::GatewayConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.is_empty() {
        errors.push(ValidationError {
            field: "listener.bind_address".into(),
            message: "must not be empty".into(),
        });
    }

    if config.registry.url.is_empty() {
        errors.push(ValidationError {
            field: "registry.url".into(),
            message: "must not be empty".into(),
        });
    }

    if config.services.names.is_empty() {
        errors.push(ValidationError {
            field: "services.names".into(),
            message: "at least one service name is required".into(),
        });
    }

    match config.resolver.replica_naming.as_str() {
        "port-digit" | "passthrough" => {}
        other => errors.push(ValidationError {
            field: "resolver.replica_naming".into(),
            message: format!("unknown strategy '{}'", other),
        }),
    }

    if config.resilience.retry_limit == 0 {
        errors.push(ValidationError {
            field: "resilience.retry_limit".into(),
            message: "must be at least 1".into(),
        });
    }

    if config.resilience.max_instance_attempts == 0 {
        errors.push(ValidationError {
            field: "resilience.max_instance_attempts".into(),
            message: "must be at least 1".into(),
        });
    }

    if config.resilience.per_call_timeout_secs == 0 {
        errors.push(ValidationError {
            field: "resilience.per_call_timeout_secs".into(),
            message: "must be greater than zero".into(),
        });
    }

    if config.admission.concurrent_task_limit == 0 {
        errors.push(ValidationError {
            field: "admission.concurrent_task_limit".into(),
            message: "must be at least 1".into(),
        });
    }

    if config.admission.sample_interval_ms == 0 {
        errors.push(ValidationError {
            field: "admission.sample_interval_ms".into(),
            message: "must be greater than zero".into(),
        });
    }

    if config.transaction.participants.len() != 2 {
        errors.push(ValidationError {
            field: "transaction.participants".into(),
            message: format!(
                "exactly two participants required, got {}",
                config.transaction.participants.len()
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.registry.url.clear();
        config.resilience.retry_limit = 0;
        config.transaction.participants = vec!["battleship".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "registry.url"));
        assert!(errors.iter().any(|e| e.field == "transaction.participants"));
    }

    #[test]
    fn test_rejects_unknown_naming_strategy() {
        let mut config = GatewayConfig::default();
        config.resolver.replica_naming = "dns".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "resolver.replica_naming");
    }
}
