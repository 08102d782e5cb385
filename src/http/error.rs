//! Translation of failures into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Failures a handler can answer with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing id or body, or a body that is not an item.
    #[error("{0}")]
    Validation(String),

    /// No item with the requested id.
    #[error("{0}")]
    NotFound(String),

    /// The backend failed.
    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |source| ApiError::Store { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            // Unknown ids are reported as a bad request.
            ApiError::Validation(_) | ApiError::NotFound(_) => StatusCode::BAD_REQUEST,
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Store { context, source } = &self {
            tracing::error!(
                context = %context,
                error = %source,
                status = ?source.status(),
                "Store operation failed"
            );
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
