use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::gateway::GatewayError;
use crate::store::StoreError;

#[derive(Debug)]
pub enum AppError {
    Internal(String),
    BadRequest(String),
    NotFound(String),
    Unauthorized,
    /// The room registry refused or failed the request.
    Upstream(String),
    /// No usable connection to the broker.
    Unavailable(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal_error",
            AppError::BadRequest(_) => "invalid_request",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Upstream(_) => "gateway_error",
            AppError::Unavailable(_) => "gateway_unavailable",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Internal(e) => {
                tracing::error!("internal error: {e}");
                "Internal Server Error".to_string()
            }
            AppError::Upstream(e) => {
                tracing::error!("gateway failure: {e}");
                "Gateway Error".to_string()
            }
            AppError::Unavailable(e) => {
                tracing::error!("gateway unavailable: {e}");
                "Gateway Unavailable".to_string()
            }
            AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Unauthorized => "Unauthorized".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "status": status.as_u16(),
            "code": self.code(),
            "message": self.message()
        });
        (status, Json(body)).into_response()
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::RoomUnknown => AppError::NotFound("Not Found".to_string()),
            GatewayError::NoRoomSession { .. } => AppError::NotFound(e.to_string()),
            GatewayError::ConnectionUnavailable { .. }
            | GatewayError::ShuttingDown
            | GatewayError::SendFailed(_)
            | GatewayError::Transport(_) => AppError::Unavailable(e.to_string()),
            e if e.is_upstream_failure() => AppError::Upstream(e.to_string()),
            e => AppError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}
