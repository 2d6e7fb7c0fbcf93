//! HTTP and WebSocket routes.

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod health;
pub mod realtime;
pub mod rooms;
pub mod webhooks;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with the public origin once the
    // frontend is served from a fixed host.
    Router::new()
        .merge(health::router())
        .merge(realtime::router())
        .nest("/api/v1/rooms", rooms::router())
        .nest("/api/v1/webhooks", webhooks::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
