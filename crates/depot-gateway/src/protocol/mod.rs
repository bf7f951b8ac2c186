//! Realtime wire protocol
//!
//! Server events and close codes.

mod close_codes;
mod events;

pub use close_codes::CloseCode;
pub use events::{Outbound, ServerEvent, USER_SOCKET_LIMIT};
