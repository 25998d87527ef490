//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, chunk size sane)
//! - Check the bind address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.max_connections must be at least 1")]
    NoConnections,

    #[error("listener.backlog must be at least 1")]
    NoBacklog,

    #[error("limits.{field} must be greater than zero")]
    ZeroLimit { field: &'static str },

    #[error("limits.chunk_size {0} exceeds the 16 MiB ceiling")]
    ChunkTooLarge(usize),

    #[error("storage.{field} must not be empty")]
    EmptyStorageField { field: &'static str },

    #[error("storage.{field} {value:?} must be a plain directory name")]
    NestedStorageField { field: &'static str, value: String },

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::NoConnections);
    }
    if config.listener.backlog == 0 {
        errors.push(ValidationError::NoBacklog);
    }

    let limits = &config.limits;
    for (field, value) in [
        ("max_header_bytes", limits.max_header_bytes),
        ("max_part_header_bytes", limits.max_part_header_bytes),
        ("max_form_bytes", limits.max_form_bytes),
        ("chunk_size", limits.chunk_size),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroLimit { field });
        }
    }
    if limits.chunk_size > MAX_CHUNK_SIZE {
        errors.push(ValidationError::ChunkTooLarge(limits.chunk_size));
    }

    let storage = &config.storage;
    for (field, value) in [("user_dir", &storage.user_dir), ("user", &storage.user)] {
        if value.is_empty() {
            errors.push(ValidationError::EmptyStorageField { field });
        } else if value.contains('/') || value.contains('\\') || value == ".." {
            errors.push(ValidationError::NestedStorageField {
                field,
                value: value.clone(),
            });
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
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
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.listener.max_connections = 0;
        config.listener.backlog = 0;
        config.limits.chunk_size = 0;
        config.storage.user = "../root".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::NoConnections));
        assert!(errors.contains(&ValidationError::NoBacklog));
        assert!(errors.contains(&ValidationError::ZeroLimit { field: "chunk_size" }));
    }

    #[test]
    fn metrics_address_only_checked_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MetricsAddress("bogus".into())])
        );
    }
}
