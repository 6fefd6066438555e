mod chat;
mod health;
mod player;
mod rooms;
mod users;

use axum::middleware as axum_mw;
use axum::routing::{get, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::auth::require_session;
use crate::state::AppState;

fn ok() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": 200, "message": "OK" }))
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let api = api_routes(&state);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/gateway", get(health::gateway_status))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Playback
        .route("/player/{room_id}/play", put(player::play))
        .route("/player/{room_id}/pause", put(player::pause))
        .route("/player/{room_id}/seek", put(player::seek))
        .route("/player/{room_id}/next", put(player::next))
        .route("/player/{room_id}/prev", put(player::prev))
        // Chat
        .route("/room/{room_id}/message", put(chat::send_message))
        // Rooms
        .route(
            "/rooms/{room_id}",
            get(rooms::get_room)
                .post(rooms::create_room)
                .delete(rooms::delete_room),
        )
        .route(
            "/rooms/{room_id}/users",
            put(rooms::add_users).delete(rooms::remove_users),
        )
        // Users
        .route("/users/@me", get(users::get_current_user))
        .route_layer(axum_mw::from_fn_with_state(state.clone(), require_session))
}
