//! Server-sent realtime events
//!
//! Every event is a JSON object tagged by `type`.

use serde::{Deserialize, Serialize};

/// Reason attached to `rate_limited` when the per-user socket cap is hit
pub const USER_SOCKET_LIMIT: &str = "user_socket_limit";

/// Event pushed from the server to a connected client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The connection's login session was revoked
    SessionRevoked {
        #[serde(rename = "sessionId")]
        session_id: String,
        reason: String,
    },
    /// Connection refused by a limit
    RateLimited { reason: String, limit: usize },
    /// Handshake could not be authenticated
    AuthError { message: String },
}

impl ServerEvent {
    pub fn session_revoked(session_id: impl ToString, reason: impl Into<String>) -> Self {
        Self::SessionRevoked {
            session_id: session_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn socket_limit(limit: usize) -> Self {
        Self::RateLimited {
            reason: USER_SOCKET_LIMIT.to_string(),
            limit,
        }
    }

    pub fn unauthorized() -> Self {
        Self::AuthError {
            message: "Unauthorized".to_string(),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// What the registry pushes down a connection's outbound channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Event(ServerEvent),
    Close(super::CloseCode),
}
