//! Service status route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use super::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(status))
}

async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state.store.stats()?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "backend": state.engine.backend_name(),
        "active_sessions": state.sessions.len(),
        "stored_sessions": stats.session_count,
        "stored_mappings": stats.mapping_count,
    })))
}
