//! Configuration loading from disk and environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply environment overrides, and validate a TOML configuration file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    load_config_str(&content)
}

/// Same as [`load_config`] for an in-memory TOML document.
pub fn load_config_str(content: &str) -> Result<AppConfig, ConfigError> {
    let mut config: AppConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, std::env::var("PORT").ok().as_deref());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Replace the listener port with a platform-assigned `PORT`, when it parses.
pub fn apply_env_overrides(config: &mut AppConfig, port: Option<&str>) {
    let Some(port) = port.and_then(|p| p.trim().parse::<u16>().ok()) else {
        return;
    };
    match config.listener.bind_address.parse::<SocketAddr>() {
        Ok(mut addr) => {
            addr.set_port(port);
            config.listener.bind_address = addr.to_string();
        }
        Err(_) => {
            config.listener.bind_address = format!("0.0.0.0:{}", port);
        }
    }
    tracing::debug!(bind_address = %config.listener.bind_address, "Applied PORT override");
}
