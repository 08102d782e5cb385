//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check backend names are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("store.table_binding and store.document_binding must differ")]
    DuplicateBinding,

    #[error("store.document_database: '{0}' is not a legal database name")]
    InvalidDatabaseName(String),
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("listener.max_body_bytes"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.retention.interval_secs == 0 {
        errors.push(ValidationError::Zero("retention.interval_secs"));
    }
    if config.retention.ceiling == 0 {
        errors.push(ValidationError::Zero("retention.ceiling"));
    }

    let store = &config.store;
    for (field, value) in [
        ("store.bindings_env", &store.bindings_env),
        ("store.table_binding", &store.table_binding),
        ("store.document_binding", &store.document_binding),
        ("store.table_database", &store.table_database),
        ("store.table_collection", &store.table_collection),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::Empty(field));
        }
    }
    if !store.table_binding.is_empty() && store.table_binding == store.document_binding {
        errors.push(ValidationError::DuplicateBinding);
    }
    if !is_legal_database_name(&store.document_database) {
        errors.push(ValidationError::InvalidDatabaseName(store.document_database.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Document database names start with a lowercase letter followed by
/// lowercase letters, digits, or any of `_$()+-/`.
pub fn is_legal_database_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_$()+-/".contains(c))
}
