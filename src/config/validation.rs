//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check addresses parse and do not collide
//! - Validate value ranges (grace period > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("api and health listeners both bind {0}")]
    DuplicateAddress(SocketAddr),

    #[error("shutdown.grace_period_secs must be greater than zero")]
    ZeroGracePeriod,

    #[error("health.path must start with '/', got {0:?}")]
    InvalidHealthPath(String),
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let api = parse_addr("api.bind_address", &config.api.bind_address, &mut errors);

    if config.health.enabled {
        let health = parse_addr("health.bind_address", &config.health.bind_address, &mut errors);
        if let (Some(api), Some(health)) = (api, health) {
            if api == health {
                errors.push(ValidationError::DuplicateAddress(api));
            }
        }
        if !config.health.path.starts_with('/') {
            errors.push(ValidationError::InvalidHealthPath(config.health.path.clone()));
        }
    }

    if config.shutdown.grace_period_secs == 0 {
        errors.push(ValidationError::ZeroGracePeriod);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a configured socket address, naming the offending field on failure.
pub fn socket_addr(field: &'static str, value: &str) -> Result<SocketAddr, ValidationError> {
    value.parse().map_err(|_| ValidationError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

fn parse_addr(
    field: &'static str,
    value: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<SocketAddr> {
    socket_addr(field, value).map_err(|e| errors.push(e)).ok()
}
