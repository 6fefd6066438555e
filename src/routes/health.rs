use axum::extract::State;
use axum::Json;

use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn gateway_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "connected": state.gateway.is_connected().await,
        "url": state.gateway.url(),
        "retry_count": state.gateway.retry_count(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
