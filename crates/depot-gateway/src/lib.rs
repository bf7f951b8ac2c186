//! # depot-gateway
//!
//! Realtime WebSocket endpoint. Authenticated clients are told, within one
//! fan-out, when their login session is revoked.

pub mod auth;
pub mod connection;
pub mod protocol;
pub mod server;

pub use auth::{AuthError, AuthPayload, ConnectionIdentity, Handshake, RealtimeAuthenticator};
pub use connection::{ConnectionId, ConnectionRegistry, RegistryStats};
pub use protocol::{CloseCode, Outbound, ServerEvent};
pub use server::{realtime_handler, router, GatewayState, Heartbeat};
