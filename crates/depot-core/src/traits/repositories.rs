//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{ActivityEntry, RefreshTokenRecord, Session, User};
use crate::error::DomainError;
use crate::value_objects::{RefreshTokenId, RevocationReason, SessionId, UserId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>>;

    /// Find user by username
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    /// Check if username is already taken
    async fn username_exists(&self, username: &str) -> RepoResult<bool>;

    /// Create a new user. Fails with `UsernameTaken` on a duplicate username.
    async fn create(&self, user: &User) -> RepoResult<()>;

    /// Store a newly provisioned OTP secret
    async fn set_otp_secret(&self, id: UserId, secret: &str) -> RepoResult<()>;

    /// Flip the OTP-enabled flag
    async fn set_otp_enabled(&self, id: UserId, enabled: bool) -> RepoResult<()>;

    /// Replace the recovery code only if it still equals `expected`.
    /// Returns false when another caller rotated it first.
    async fn replace_recovery_code(
        &self,
        id: UserId,
        expected: &str,
        replacement: &str,
    ) -> RepoResult<bool>;

    /// Update password hash
    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> RepoResult<()>;

    /// Record a successful login
    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> RepoResult<()>;

    /// Role names currently assigned to the user
    async fn roles_for(&self, id: UserId) -> RepoResult<Vec<String>>;

    /// Assign a role by name, creating the role if needed. Idempotent.
    async fn assign_role(&self, id: UserId, role: &str) -> RepoResult<()>;
}

// ============================================================================
// Session Repository
// ============================================================================

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a session together with its first refresh token, atomically
    async fn create_session(
        &self,
        session: &Session,
        token: &RefreshTokenRecord,
    ) -> RepoResult<()>;

    /// Find session by ID regardless of state
    async fn find_session(&self, id: SessionId) -> RepoResult<Option<Session>>;

    /// Unrevoked, unexpired sessions of a user, newest first
    async fn list_active(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        limit: u32,
    ) -> RepoResult<Vec<Session>>;

    /// Revoke a session and every unrevoked refresh token in it.
    /// Returns false if the session was already revoked.
    async fn revoke_session(
        &self,
        id: SessionId,
        reason: &RevocationReason,
        at: DateTime<Utc>,
    ) -> RepoResult<bool>;

    /// Revoke every unrevoked session of a user except `exclude`, cascading to tokens.
    /// Returns the ids that were revoked.
    async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        exclude: Option<SessionId>,
        reason: &RevocationReason,
        at: DateTime<Utc>,
    ) -> RepoResult<Vec<SessionId>>;

    /// Most recent refresh tokens of a session, newest first
    async fn recent_refresh_tokens(
        &self,
        session_id: SessionId,
        limit: u32,
    ) -> RepoResult<Vec<RefreshTokenRecord>>;

    /// In one transaction: mark `current` rotated with `replaced_by` pointing at
    /// `replacement`, and insert `replacement`. Only succeeds while `current` is
    /// still unrevoked; returns false (and writes nothing) otherwise.
    async fn replace_refresh_token(
        &self,
        current: RefreshTokenId,
        replacement: &RefreshTokenRecord,
        at: DateTime<Utc>,
    ) -> RepoResult<bool>;
}

// ============================================================================
// Activity Repository
// ============================================================================

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Append an activity entry
    async fn record(&self, entry: &ActivityEntry) -> RepoResult<()>;

    /// Newest entries of a user
    async fn recent(&self, user_id: UserId, limit: u32) -> RepoResult<Vec<ActivityEntry>>;
}
