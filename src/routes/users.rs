use axum::extract::State;
use axum::{Extension, Json};

use crate::error::AppError;
use crate::middleware::auth::SessionUser;
use crate::state::AppState;

/// Room session of the caller, if they currently hold one.
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    let body = match state.rooms.room_session(&user.id).await? {
        Some(session) => serde_json::json!({
            "status": 200,
            "exists": true,
            "session_id": session.session_id,
            "room_id": session.room_id
        }),
        None => serde_json::json!({
            "status": 200,
            "exists": false,
            "session_id": null
        }),
    };
    Ok(Json(body))
}
