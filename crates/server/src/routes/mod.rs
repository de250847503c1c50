//! API route handlers.

pub mod conversations;
pub mod health;
pub mod live;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - GET  /api/conversations - Conversation list with state (`?status=active|recent|inactive`)
/// - GET  /api/conversations/{id}/messages - Paginated messages (`?offset&limit`)
/// - GET  /api/conversations/{id}/state - Current conversation state
/// - POST /api/cache/clear - Drop all cached parses
/// - GET  /api/cache/stats - Cache hit/miss counters
/// - GET  /api/live/ws - WebSocket push channel
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", conversations::router())
        .nest("/api", live::router())
        .with_state(state)
}
