pub mod generation;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate                 requirements -> running service (POST)
/// /status                   live instances with uptime (GET)
/// /stop/{api_id}            stop and deregister an instance (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(generation::router())
}
