//! Non-repository ports: short-lived cache state, crypto primitives, time,
//! randomness, and the realtime notification sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::traits::RepoResult;
use crate::value_objects::{RevocationReason, SessionId, UserId};

// ============================================================================
// Cache-backed ports
// ============================================================================

/// Marks access-token identifiers as revoked until they would expire anyway
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    async fn add(&self, jti: &str, ttl_secs: u64, reason: &str) -> RepoResult<()>;

    async fn is_blacklisted(&self, jti: &str) -> RepoResult<bool>;

    async fn remove(&self, jti: &str) -> RepoResult<()>;
}

/// Outcome of counting one attempt against a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptDecision {
    Allowed { attempts: u32 },
    Blocked { retry_after_secs: u64 },
}

/// Fixed-window attempt counter
#[async_trait]
pub trait AttemptLimiter: Send + Sync {
    /// Count an attempt under `key`. Once `limit` attempts are recorded within
    /// `window_secs`, further calls are blocked until the window expires.
    async fn check_and_increment(
        &self,
        key: &str,
        limit: u32,
        window_secs: u64,
    ) -> RepoResult<AttemptDecision>;

    async fn reset(&self, key: &str) -> RepoResult<()>;
}

// ============================================================================
// Crypto primitives
// ============================================================================

/// Data needed by an authenticator app to enroll a secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpProvisioning {
    pub otpauth_url: String,
    /// PNG QR code as a `data:` URL
    pub qr_code: String,
}

/// Time-based one-time password checks
pub trait OtpVerifier: Send + Sync {
    /// New base32 secret
    fn generate_secret(&self) -> String;

    /// Check `code` against `secret` at `now`. Malformed input is simply false.
    fn verify(&self, secret: &str, code: &str, now: DateTime<Utc>) -> bool;

    fn provisioning(&self, secret: &str, account: &str) -> Result<OtpProvisioning, DomainError>;
}

/// One-way hashing for passwords and refresh secrets
pub trait SecretHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, DomainError>;

    /// False on mismatch or on an unparsable hash
    fn verify(&self, secret: &str, hash: &str) -> bool;
}

// ============================================================================
// Time and randomness
// ============================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cryptographically secure random bytes
pub trait RandomSource: Send + Sync {
    fn fill(&self, buf: &mut [u8]);
}

// ============================================================================
// Realtime notifications
// ============================================================================

/// Receives revocations so live connections can be told about them
pub trait SessionEventSink: Send + Sync {
    fn session_revoked(&self, session_id: SessionId, reason: &RevocationReason);

    fn user_bulk_revoked(
        &self,
        user_id: UserId,
        revoked: &[SessionId],
        reason: &RevocationReason,
        exclude: Option<SessionId>,
    );
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl SessionEventSink for NoopEventSink {
    fn session_revoked(&self, _session_id: SessionId, _reason: &RevocationReason) {}

    fn user_bulk_revoked(
        &self,
        _user_id: UserId,
        _revoked: &[SessionId],
        _reason: &RevocationReason,
        _exclude: Option<SessionId>,
    ) {
    }
}
