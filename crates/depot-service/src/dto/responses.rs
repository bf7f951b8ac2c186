//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output.

use chrono::{DateTime, Utc};
use depot_core::{SessionId, UserId};
use serde::Serialize;

use crate::user_agent::DeviceSummary;

// ============================================================================
// Common Response Types
// ============================================================================

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Auth Responses
// ============================================================================

/// Identity carried next to a freshly issued access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub roles: Vec<String>,
}

/// Successful login or refresh. The refresh artifact travels in a cookie,
/// never in the body.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub session_id: SessionId,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_recovery_code: Option<String>,
}

/// Everything an authenticator app needs, plus the one-time recovery code
#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub user_id: UserId,
    pub username: String,
    pub otpauth_url: String,
    /// PNG QR code as a `data:` URL
    pub qr_code: String,
    pub recovery_code: String,
    pub secret: String,
}

/// The authenticated caller
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<String>,
    pub session_id: SessionId,
}

// ============================================================================
// Session Responses
// ============================================================================

/// One login session as shown in the device list
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    #[serde(flatten)]
    pub device: DeviceSummary,
    pub is_current: bool,
    pub status: &'static str,
}

/// Result of a bulk revocation
#[derive(Debug, Clone, Serialize)]
pub struct RevokeAllResponse {
    pub revoked: usize,
}

// ============================================================================
// Profile Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ActivityResponse {
    pub id: uuid::Uuid,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Enrollment data for turning on MFA
#[derive(Debug, Clone, Serialize)]
pub struct MfaSetupResponse {
    pub otpauth_url: String,
    pub qr_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MfaStatusResponse {
    pub enabled: bool,
}

// ============================================================================
// Health Responses
// ============================================================================

/// Basic health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
    pub realtime: RealtimeCounts,
}

/// Health check status for each backing service
#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub database: String,
    pub redis: String,
}

/// Live connection counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RealtimeCounts {
    pub sessions: usize,
    pub users: usize,
    pub sockets: usize,
}

impl ReadinessResponse {
    pub fn ready(database_healthy: bool, redis_healthy: bool, realtime: RealtimeCounts) -> Self {
        let all_healthy = database_healthy && redis_healthy;
        Self {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            timestamp: Utc::now(),
            checks: HealthChecks {
                database: if database_healthy { "healthy" } else { "unhealthy" }.to_string(),
                redis: if redis_healthy { "healthy" } else { "unhealthy" }.to_string(),
            },
            realtime,
        }
    }
}
