//! Reasons recorded when a session or refresh token is revoked

use std::fmt;

/// Why a session or refresh token was revoked
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RevocationReason {
    /// Token replaced by its successor during rotation
    Rotated,
    /// User logged out
    Logout,
    /// Refresh artifact presented with a prefix that is not this session
    InvalidPrefix,
    /// Presented secret matched none of the recent tokens
    InvalidOrReuse,
    /// Presented secret matched a token that was already revoked or expired
    ReuseDetected,
    /// Revoked as part of a revoke-all
    Bulk,
    /// Revoked because the password changed
    PasswordChange,
    /// Revoked explicitly by the user from the session list
    UserRevoked,
    /// Free-form reason supplied by a caller
    Other(String),
}

impl RevocationReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Rotated => "rotated",
            Self::Logout => "logout",
            Self::InvalidPrefix => "invalid_prefix",
            Self::InvalidOrReuse => "invalid_or_reuse",
            Self::ReuseDetected => "reuse_detected",
            Self::Bulk => "bulk",
            Self::PasswordChange => "password_change",
            Self::UserRevoked => "user_revoked",
            Self::Other(reason) => reason,
        }
    }

    /// Whether this revocation means a refresh secret was replayed or forged
    pub fn is_reuse(&self) -> bool {
        matches!(
            self,
            Self::InvalidPrefix | Self::InvalidOrReuse | Self::ReuseDetected
        )
    }
}

impl From<&str> for RevocationReason {
    fn from(s: &str) -> Self {
        match s {
            "rotated" => Self::Rotated,
            "logout" => Self::Logout,
            "invalid_prefix" => Self::InvalidPrefix,
            "invalid_or_reuse" => Self::InvalidOrReuse,
            "reuse_detected" => Self::ReuseDetected,
            "bulk" => Self::Bulk,
            "password_change" => Self::PasswordChange,
            "user_revoked" => Self::UserRevoked,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
