//! Domain record and error definitions shared by every backend.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single ToDo entry.
///
/// The `id` is assigned by the store on `persist`; callers never supply one
/// for a new item. Equality is structural over all four fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    /// Store-assigned identity. Absent until persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Free-form title.
    pub title: String,

    /// Completion flag.
    pub completed: bool,

    /// Client-chosen ordering number.
    pub order: i64,
}

impl Item {
    /// Create an item that has not been persisted yet.
    pub fn new(title: impl Into<String>, completed: bool, order: i64) -> Self {
        Self {
            id: None,
            title: title.into(),
            completed,
            order,
        }
    }

    /// Return a copy of this item carrying the given identity.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Errors surfaced by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend answered with a status the operation does not accept.
    #[error("{operation} failed: backend returned status {status}")]
    Status { operation: &'static str, status: u16 },

    /// The HTTP round trip to the backend failed.
    #[error("{operation} failed: {source}")]
    Http {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The table backend driver reported an error.
    #[error("{operation} failed: {source}")]
    Table {
        operation: &'static str,
        #[source]
        source: mongodb::error::Error,
    },

    /// The identifier is not in the backend's native format.
    #[error("invalid identifier '{0}'")]
    InvalidId(String),

    /// A backend payload could not be decoded.
    #[error("malformed backend record: {0}")]
    Malformed(String),

    /// Connection settings are unusable.
    #[error("store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Status code carried by the error, when the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Status { status, .. } => Some(*status),
            StoreError::Http { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
