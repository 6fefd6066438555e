use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use super::ok;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UsersRequest {
    pub user_ids: Vec<String>,
}

impl UsersRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.user_ids.is_empty() {
            return Err(AppError::BadRequest("user_ids must not be empty".to_string()));
        }
        if self.user_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(AppError::BadRequest("user_ids contains a blank id".to_string()));
        }
        Ok(())
    }
}

pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.rooms.room_exists(&room_id).await? {
        return Err(AppError::NotFound("Not Found".to_string()));
    }
    let members = state.rooms.members(&room_id).await?;
    Ok(Json(serde_json::json!({
        "status": 200,
        "room_id": room_id,
        "members": members
    })))
}

pub async fn create_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.rooms.create_room(&room_id).await?;
    Ok(ok())
}

pub async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.rooms.delete_room(&room_id).await?;
    Ok(ok())
}

pub async fn add_users(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(input): Json<UsersRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    input.validate()?;
    let sessions = state.rooms.add_users(&room_id, &input.user_ids).await?;

    let sessions: Vec<serde_json::Value> = input
        .user_ids
        .iter()
        .zip(sessions)
        .map(|(user_id, session)| {
            serde_json::json!({
                "user_id": user_id,
                "session_id": session.session_id
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "status": 200,
        "message": "OK",
        "sessions": sessions
    })))
}

pub async fn remove_users(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(input): Json<UsersRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    input.validate()?;
    state.rooms.remove_users(&room_id, &input.user_ids).await?;
    Ok(ok())
}
