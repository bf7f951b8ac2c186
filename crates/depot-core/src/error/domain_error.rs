//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::{SessionId, UserId};

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    // =========================================================================
    // Authentication Errors
    // =========================================================================
    /// Wrong password or recovery code
    #[error("Invalid credentials")]
    InvalidCredential,

    /// Wrong OTP code. Rendered exactly like `InvalidCredential`.
    #[error("Invalid credentials")]
    InvalidOtp,

    /// Any refresh/access token failure. The cause is never surfaced.
    #[error("Invalid token")]
    InvalidToken,

    #[error("Too many attempts, retry in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Username already taken")]
    UsernameTaken,

    #[error("MFA already enabled")]
    MfaAlreadyEnabled,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    pub fn user_not_found(id: UserId) -> Self {
        Self::UserNotFound(id.to_string())
    }

    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::SessionNotFound(_) => "UNKNOWN_SESSION",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",

            // Authentication
            Self::InvalidCredential | Self::InvalidOtp => "INVALID_CREDENTIALS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::RateLimited { .. } => "RATE_LIMITED",

            // Conflict
            Self::UsernameTaken => "USERNAME_TAKEN",
            Self::MfaAlreadyEnabled => "MFA_ALREADY_ENABLED",

            // Infrastructure
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::CacheError(_) => "CACHE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound(_) | Self::SessionNotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }

    /// Check if the caller failed to authenticate
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredential | Self::InvalidOtp | Self::InvalidToken
        )
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::UsernameTaken | Self::MfaAlreadyEnabled)
    }

    /// Seconds until a rate-limited caller may retry
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}
