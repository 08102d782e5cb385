//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the ToDo service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Backend selection and naming.
    pub store: StoreConfig,

    /// Background cleanup of excess items.
    pub retention: RetentionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Environment variable holding the platform's service bindings.
    pub bindings_env: String,

    /// Binding name that selects the table backend.
    pub table_binding: String,

    /// Binding name that selects the document backend.
    pub document_binding: String,

    /// Database created and used in the document backend.
    pub document_database: String,

    /// Table backend database, used when the connection URI names none.
    pub table_database: String,

    /// Table backend collection.
    pub table_collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bindings_env: "VCAP_SERVICES".to_string(),
            table_binding: "todo-mongo-db".to_string(),
            document_binding: "todo-couch-db".to_string(),
            document_database: "bluemix-todo".to_string(),
            table_database: "todos".to_string(),
            table_collection: "todos".to_string(),
        }
    }
}

/// Retention task configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Run the retention task.
    pub enabled: bool,

    /// Seconds between ticks.
    pub interval_secs: u64,

    /// Item count at or above which one item is evicted per tick.
    pub ceiling: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            ceiling: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
