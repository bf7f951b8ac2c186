//! # depot-api
//!
//! REST API server built with Axum. The realtime endpoint is served from
//! the same process so revocations reach live connections.

pub mod cookies;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, create_app_state, create_memory_state, run, run_server};
pub use state::AppState;
