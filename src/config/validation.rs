//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges
//! - Detect listeners that collide on the same address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: InvokerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::InvokerConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{first} and {second} share address {address}")]
    AddressConflict {
        first: &'static str,
        second: &'static str,
        address: SocketAddr,
    },

    #[error("admin.api_key must not be empty when the admin API is enabled")]
    EmptyApiKey,
}

pub fn validate_config(config: &InvokerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut bound: Vec<(&'static str, SocketAddr)> = Vec::new();

    let mut address = |field: &'static str, value: &str, errors: &mut Vec<ValidationError>| {
        match value.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Some(&(first, _)) = bound.iter().find(|(_, a)| *a == addr && addr.port() != 0) {
                    errors.push(ValidationError::AddressConflict {
                        first,
                        second: field,
                        address: addr,
                    });
                }
                bound.push((field, addr));
            }
            Err(_) => errors.push(ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
            }),
        }
    };

    address("listener.bind_address", &config.listener.bind_address, &mut errors);
    address("discovery.bind_address", &config.discovery.bind_address, &mut errors);
    if config.admin.enabled {
        address("admin.bind_address", &config.admin.bind_address, &mut errors);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::EmptyApiKey);
        }
    }
    if config.observability.metrics_enabled {
        address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.max_body_bytes",
        });
    }
    if config.listener.request_timeout_secs == Some(0) {
        errors.push(ValidationError::Zero {
            field: "listener.request_timeout_secs",
        });
    }
    if config.discovery.channel_capacity == 0 {
        errors.push(ValidationError::Zero {
            field: "discovery.channel_capacity",
        });
    }
    if config.invocation.timeout_ms == Some(0) {
        errors.push(ValidationError::Zero {
            field: "invocation.timeout_ms",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
