//! Session lifecycle, document anonymization, and de-anonymization routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use veil_core::Error;

use super::ApiError;
use crate::sessions::Session;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route(
            "/sessions/{id}",
            get(get_session).delete(clear_session),
        )
        .route("/sessions/{id}/document", post(anonymize_document))
        .route("/sessions/{id}/deanonymize", post(deanonymize))
}

#[derive(serde::Deserialize)]
struct TextInput {
    text: String,
}

#[derive(serde::Serialize)]
struct DocumentResponse {
    session_id: String,
    anonymized_text: String,
    mapping_count: i64,
}

async fn create_session(State(state): State<Arc<AppState>>) -> Json<Session> {
    Json(state.sessions.create())
}

/// Session status: lifecycle timestamps and the mapping count, never the
/// stored original values.
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
    let mapping_count = state.store.count_for_session(&id)?;
    Ok(Json(serde_json::json!({
        "session": session,
        "mapping_count": mapping_count,
    })))
}

/// Drop the session and every mapping it holds.
async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.engine.clear_session(&id)?;
    let existed = state.sessions.remove(&id);
    Ok(Json(serde_json::json!({
        "session_id": id,
        "existed": existed,
        "mappings_deleted": deleted,
    })))
}

/// Anonymize an uploaded document and remember the rewritten text for the
/// session.
async fn anonymize_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<TextInput>,
) -> Result<Json<DocumentResponse>, ApiError> {
    state
        .sessions
        .get(&id)
        .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;

    let anonymized = state.engine.anonymize(&input.text, &id).await?;
    state.sessions.set_document(&id, anonymized.clone());
    let mapping_count = state.store.count_for_session(&id)?;

    Ok(Json(DocumentResponse {
        session_id: id,
        anonymized_text: anonymized,
        mapping_count,
    }))
}

/// Restore original values in model output for this session.
async fn deanonymize(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<TextInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let restored = state.engine.deanonymize(&input.text, &id)?;
    Ok(Json(serde_json::json!({ "text": restored })))
}
