use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;

use super::ok;
use crate::error::AppError;
use crate::gateway::OutboundEvent;
use crate::middleware::auth::SessionUser;
use crate::state::AppState;

const MAX_MESSAGE_LEN: usize = 2000;

#[derive(Deserialize)]
pub struct MessageRequest {
    pub content: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Extension(user): Extension<SessionUser>,
    Json(input): Json<MessageRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let content = input.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("message content is empty".to_string()));
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::BadRequest(format!(
            "message content exceeds {MAX_MESSAGE_LEN} characters"
        )));
    }

    state
        .gateway
        .send(OutboundEvent::message(room_id, content, user.author()))
        .await?;
    Ok(ok())
}
