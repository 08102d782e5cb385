//! Named service credentials supplied by the hosting platform.
//!
//! The platform publishes bound services as JSON in an environment variable:
//! ```text
//! { "<service label>": [ { "name": "todo-couch-db", "credentials": { "url": "..." } } ] }
//! ```
//! Only the instance name and its credentials matter here.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

/// Errors reading service bindings.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("service bindings are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Connection credentials of one bound service.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Any other keys the platform supplied.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Credentials {
    /// Connection string, preferring `url` over `uri`.
    pub fn connection_string(&self) -> Option<&str> {
        self.url.as_deref().or(self.uri.as_deref())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("has_url", &self.connection_string().is_some())
            .field("username", &self.username)
            .field("extra_keys", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ServiceInstance {
    name: String,
    #[serde(default)]
    credentials: Credentials,
}

/// The resolved set of named service credentials.
#[derive(Debug, Clone, Default)]
pub struct ServiceBindings {
    services: HashMap<String, Credentials>,
}

impl ServiceBindings {
    /// An empty set: no services bound.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the platform JSON document.
    pub fn parse(raw: &str) -> Result<Self, BindingError> {
        let by_label: HashMap<String, Vec<ServiceInstance>> = serde_json::from_str(raw)?;
        let services = by_label
            .into_values()
            .flatten()
            .map(|instance| (instance.name, instance.credentials))
            .collect();
        Ok(Self { services })
    }

    /// Read bindings from `var`. An unset or blank variable means no bindings.
    pub fn from_env(var: &str) -> Result<Self, BindingError> {
        match std::env::var(var) {
            Ok(raw) if !raw.trim().is_empty() => Self::parse(&raw),
            _ => Ok(Self::empty()),
        }
    }

    /// Add or replace one binding.
    pub fn with(mut self, name: impl Into<String>, credentials: Credentials) -> Self {
        self.services.insert(name.into(), credentials);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Credentials> {
        self.services.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VCAP: &str = r#"{
        "cloudantNoSQLDB": [
            {"name": "todo-couch-db", "label": "cloudantNoSQLDB",
             "credentials": {"url": "https://u:p@host.example.com", "port": 443}}
        ],
        "mongodb": [
            {"name": "todo-mongo-db", "credentials": {"uri": "mongodb://h:27017/db"}}
        ]
    }"#;

    #[test]
    fn test_parse_platform_document() {
        let bindings = ServiceBindings::parse(VCAP).unwrap();
        let couch = bindings.get("todo-couch-db").unwrap();
        assert_eq!(couch.connection_string(), Some("https://u:p@host.example.com"));
        assert_eq!(couch.extra["port"], 443);

        let mongo = bindings.get("todo-mongo-db").unwrap();
        assert_eq!(mongo.connection_string(), Some("mongodb://h:27017/db"));
        assert!(bindings.get("other").is_none());
    }

    #[test]
    fn test_url_preferred_over_uri() {
        let creds = Credentials {
            url: Some("a".into()),
            uri: Some("b".into()),
            ..Default::default()
        };
        assert_eq!(creds.connection_string(), Some("a"));
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(ServiceBindings::parse("{not json"), Err(BindingError::Parse(_))));
        assert!(ServiceBindings::parse(r#"{"x": 1}"#).is_err());
    }

    #[test]
    fn test_unset_variable_is_empty() {
        let bindings = ServiceBindings::from_env("TODO_BACKEND_TEST_UNSET_VARIABLE").unwrap();
        assert!(bindings.is_empty());
    }
}
