//! Realtime endpoint
//!
//! Mounted by the HTTP server so that revocations issued by request
//! handlers reach the same registry.

mod handler;
mod heartbeat;
mod state;

pub use handler::realtime_handler;
pub use heartbeat::Heartbeat;
pub use state::GatewayState;

use axum::{extract::FromRef, routing::get, Router};

/// Realtime routes, mountable on any router whose state yields a
/// [`GatewayState`]
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    GatewayState: FromRef<S>,
{
    Router::new().route("/ws", get(realtime_handler))
}
