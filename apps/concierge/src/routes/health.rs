use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::llm_client::MODEL;
use crate::state::AppState;

/// GET /health
/// Returns service status, version, model and live session count.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "concierge",
        "model": MODEL,
        "sessions": state.sessions.len().await
    }))
}
