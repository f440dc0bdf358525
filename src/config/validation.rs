//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, ports valid)
//! - Keep file names inside the store directory
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SidecarConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::{SidecarConfig, Transport};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &SidecarConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.readiness.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "readiness.poll_interval_ms",
            "must be greater than 0",
        ));
    }

    if config.rpc.request_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "rpc.request_timeout_ms",
            "must be greater than 0",
        ));
    }

    if config.engine.transport == Transport::Tcp {
        if config.engine.port == 0 {
            errors.push(ValidationError::new("engine.port", "must be non-zero for tcp transport"));
        }
        if config.engine.host.trim().is_empty() {
            errors.push(ValidationError::new("engine.host", "must not be empty for tcp transport"));
        }
    }

    if config.engine.binary_name.trim().is_empty() {
        errors.push(ValidationError::new("engine.binary_name", "must not be empty"));
    }

    let suffix = &config.storage.secret_suffix;
    if !suffix.starts_with('.') || suffix.len() < 2 {
        errors.push(ValidationError::new(
            "storage.secret_suffix",
            format!("'{}' must start with '.' and name an extension", suffix),
        ));
    }

    let socket = &config.storage.socket_name;
    if socket.is_empty() || socket.contains('/') || socket == "." || socket == ".." {
        errors.push(ValidationError::new(
            "storage.socket_name",
            format!("'{}' must be a plain file name", socket),
        ));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!(
                "'{}' is not one of {}",
                config.observability.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
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
    fn test_defaults_are_valid() {
        assert!(validate_config(&SidecarConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = SidecarConfig::default();
        config.readiness.poll_interval_ms = 0;
        config.rpc.request_timeout_ms = 0;
        config.storage.socket_name = "../engine.sock".into();
        config.storage.secret_suffix = "enc".into();
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "readiness.poll_interval_ms",
                "rpc.request_timeout_ms",
                "storage.secret_suffix",
                "storage.socket_name",
                "observability.log_level",
            ]
        );
    }

    #[test]
    fn test_port_only_checked_for_tcp() {
        let mut config = SidecarConfig::default();
        config.engine.port = 0;
        assert!(validate_config(&config).is_ok());

        config.engine.transport = Transport::Tcp;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "engine.port");
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let mut config = SidecarConfig::default();
        config.observability.log_level = "DEBUG".into();
        assert!(validate_config(&config).is_ok());
    }
}
