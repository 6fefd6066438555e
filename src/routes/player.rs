use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use super::ok;
use crate::error::AppError;
use crate::gateway::OutboundEvent;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SeekRequest {
    pub position: i64,
}

pub async fn play(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.gateway.send(OutboundEvent::play(room_id)).await?;
    Ok(ok())
}

pub async fn pause(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.gateway.send(OutboundEvent::pause(room_id)).await?;
    Ok(ok())
}

pub async fn seek(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(input): Json<SeekRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if input.position < 0 {
        return Err(AppError::BadRequest(
            "position must not be negative".to_string(),
        ));
    }
    state
        .gateway
        .send(OutboundEvent::seek(room_id, input.position))
        .await?;
    Ok(ok())
}

pub async fn next(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.gateway.send(OutboundEvent::next(room_id)).await?;
    Ok(ok())
}

pub async fn prev(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.gateway.send(OutboundEvent::prev(room_id)).await?;
    Ok(ok())
}
