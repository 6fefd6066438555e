use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::store::StoreError;

/// Failures at the socket layer. Only these are retried by the supervisor.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket is closed")]
    Closed,
    #[error("transport session has been released")]
    Released,
    #[error("socket write timed out")]
    TimedOut,
    #[error(transparent)]
    WebSocket(#[from] tungstenite::Error),
}

impl TransportError {
    /// Whether another connect attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Closed | TransportError::TimedOut => true,
            TransportError::Released => false,
            TransportError::WebSocket(e) => !matches!(
                e,
                tungstenite::Error::Url(_) | tungstenite::Error::Capacity(_)
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unavailable after {attempts} connect attempt(s)")]
    ConnectionUnavailable { attempts: u32 },
    #[error("gateway connection is shutting down")]
    ShuttingDown,
    #[error("failed to send event after reconnect: {0}")]
    SendFailed(#[source] TransportError),
    #[error("gateway connection failed: {0}")]
    Transport(#[source] TransportError),
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("room is unknown to the gateway")]
    RoomUnknown,
    #[error("gateway rejected the request ({status})")]
    BadRequest { status: u16 },
    #[error("gateway returned an unexpected status ({status})")]
    UnknownException { status: u16 },
    #[error("room registry unreachable: {0}")]
    Registry(#[from] reqwest::Error),
    #[error("user {user_id} has no session in room {room_id}")]
    NoRoomSession { user_id: String, room_id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GatewayError {
    /// Classify a room registry response. Anything at or above 400 that is not
    /// a 404 is a generic upstream failure; 4xx and 5xx are kept apart only so
    /// the logs show which side was at fault.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            404 => Some(GatewayError::RoomUnknown),
            400..=499 => Some(GatewayError::BadRequest { status }),
            _ => Some(GatewayError::UnknownException { status }),
        }
    }

    pub fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::BadRequest { .. }
                | GatewayError::UnknownException { .. }
                | GatewayError::Registry(_)
        )
    }
}
