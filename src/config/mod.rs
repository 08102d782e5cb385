//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, PORT override)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → passed by reference to subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AppConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::RetentionConfig;
pub use schema::StoreConfig;
