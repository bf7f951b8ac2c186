//! Request DTOs for API endpoints
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.
//! Multi-word fields also accept their camelCase spelling.

use serde::Deserialize;
use validator::Validate;

// ============================================================================
// Auth Requests
// ============================================================================

/// Account registration request. Accounts start with OTP only.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32, message = "Username must be 3-32 characters"))]
    pub username: String,
}

/// OTP login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    /// Six-digit code from the authenticator app
    #[validate(length(min = 1, max = 16, message = "OTP token is required"))]
    pub token: String,
}

/// Recovery code login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecoveryLoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[serde(alias = "recoveryCode")]
    #[validate(length(min = 1, max = 64, message = "Recovery code is required"))]
    pub recovery_code: String,
}

// ============================================================================
// Profile Requests
// ============================================================================

/// Password change request. `current_password` may be omitted when no
/// password has been set yet.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[serde(default, alias = "currentPassword")]
    pub current_password: Option<String>,

    #[serde(alias = "newPassword")]
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

/// OTP code confirming an MFA change
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OtpCodeRequest {
    #[validate(length(min = 1, max = 16, message = "OTP token is required"))]
    pub token: String,
}

/// Query for bulk session revocation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkRevokeQuery {
    #[serde(default, rename = "keepCurrent", alias = "keep_current")]
    pub keep_current: bool,
}
