//! Gateway route definitions

use axum::routing::get;
use axum::Router;

use super::handlers;
use super::server::AppState;
use super::websocket;

/// Create the gateway router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Browsers connect to the bare host; `/ws` is kept as an alias
        .route("/", get(websocket::events::events_ws))
        .route("/ws", get(websocket::events::events_ws))
        .route("/health", get(handlers::health::health_check))
        .route("/logs", get(handlers::logs::list_logs))
        .with_state(state)
}
