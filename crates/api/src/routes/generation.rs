//! Route definitions for generation and instance lifecycle endpoints.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Routes mounted at `/api`.
///
/// ```text
/// POST   /generate          -> generate
/// GET    /status            -> status
/// DELETE /stop/{api_id}     -> stop
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generation::generate))
        .route("/status", get(generation::status))
        .route("/stop/{api_id}", delete(generation::stop))
}
