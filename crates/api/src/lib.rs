//! apiforge orchestrator library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! inference clients) so integration tests and the binary entrypoint share
//! them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
