//! Handlers for the `/todos` resource.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::store::Item;

const MISSING_ID: &str = "Must supply an ID, for example /todos/123.";

/// Decode an item body, rejecting empty and malformed payloads.
fn parse_item(body: &Bytes, verb: &str) -> Result<Item, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::Validation(format!(
            "Must supply a ToDo in the {} body.",
            verb
        )));
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Body is not a valid ToDo: {}", e)))
}

/// GET /todos
pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state
        .store
        .get_all()
        .await
        .map_err(ApiError::store("Error getting all ToDos."))?;
    Ok(Json(items))
}

/// GET /todos/{id}
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    match state
        .store
        .get(&id)
        .await
        .map_err(ApiError::store("Error getting ToDo."))?
    {
        Some(item) => Ok(Json(item)),
        None => Err(ApiError::NotFound(format!(
            "ToDo with the ID {} does not exist.",
            id
        ))),
    }
}

/// POST /todos
pub async fn create_item(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let mut item = parse_item(&body, "POST")?;
    item.id = None;
    let saved = state
        .store
        .persist(item)
        .await
        .map_err(ApiError::store("Error saving ToDo."))?;
    tracing::debug!(id = ?saved.id, "ToDo created");
    Ok((StatusCode::CREATED, Json(saved)))
}

/// PUT /todos/{id}
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Item>, ApiError> {
    let item = parse_item(&body, "PUT")?;
    match state
        .store
        .update(&id, item)
        .await
        .map_err(ApiError::store("Error updating ToDo."))?
    {
        Some(updated) => Ok(Json(updated)),
        None => Err(ApiError::NotFound(format!(
            "The ToDo with the ID {} does not exist.",
            id
        ))),
    }
}

/// DELETE /todos/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .delete(&id)
        .await
        .map_err(ApiError::store("Error deleting ToDo."))?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT or DELETE on the collection itself.
pub async fn missing_id() -> ApiError {
    ApiError::Validation(MISSING_ID.to_string())
}
