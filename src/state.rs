use std::sync::Arc;

use crate::gateway::GatewayConnection;
use crate::rooms::RoomService;
use crate::store::SessionStore;

/// Shared by every handler. Each field is a handle onto one process-wide
/// resource created in `main`.
#[derive(Clone)]
pub struct AppState {
    pub gateway: GatewayConnection,
    pub rooms: RoomService,
    pub store: Arc<dyn SessionStore>,
}
