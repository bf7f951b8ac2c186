//! WebSocket close codes
//!
//! Application close codes sent when the server ends a realtime connection.

use serde::{Deserialize, Serialize};

/// Realtime close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error occurred
    UnknownError = 4000,
    /// Handshake carried no valid access token
    AuthenticationFailed = 4004,
    /// User already holds the maximum number of sockets
    RateLimited = 4008,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4004 => Some(Self::AuthenticationFailed),
            4008 => Some(Self::RateLimited),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Short reason sent in the close frame
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::UnknownError => "unknown error",
            Self::AuthenticationFailed => "unauthorized",
            Self::RateLimited => "user_socket_limit",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_u16(), self.reason())
    }
}
