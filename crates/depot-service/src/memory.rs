//! In-memory implementations of the core ports
//!
//! Used by the service, gateway, and end-to-end tests, and by the API server
//! when it runs without Postgres and Redis.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};

use depot_core::entities::{ActivityEntry, RefreshTokenRecord, Session, User};
use depot_core::error::DomainError;
use depot_core::traits::{
    ActivityRepository, AttemptDecision, AttemptLimiter, Clock, RepoResult, SessionEventSink,
    SessionRepository, TokenBlacklist, UserRepository,
};
use depot_core::value_objects::{RefreshTokenId, RevocationReason, SessionId, UserId};

// ============================================================================
// Clock
// ============================================================================

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Default)]
struct UserState {
    users: HashMap<UserId, User>,
    roles: HashMap<UserId, BTreeSet<String>>,
}

/// In-memory user store
#[derive(Default)]
pub struct InMemoryUserRepository {
    state: RwLock<UserState>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, id: UserId, f: F) -> RepoResult<()>
    where
        F: FnOnce(&mut User),
    {
        let mut state = self.state.write();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::user_not_found(id))?;
        f(user);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        Ok(self.state.read().users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(self
            .state
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> RepoResult<bool> {
        Ok(self
            .state
            .read()
            .users
            .values()
            .any(|u| u.username == username))
    }

    async fn create(&self, user: &User) -> RepoResult<()> {
        let mut state = self.state.write();
        if state.users.values().any(|u| u.username == user.username) {
            return Err(DomainError::UsernameTaken);
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn set_otp_secret(&self, id: UserId, secret: &str) -> RepoResult<()> {
        self.update(id, |u| u.otp_secret = Some(secret.to_string()))
    }

    async fn set_otp_enabled(&self, id: UserId, enabled: bool) -> RepoResult<()> {
        self.update(id, |u| u.otp_enabled = enabled)
    }

    async fn replace_recovery_code(
        &self,
        id: UserId,
        expected: &str,
        replacement: &str,
    ) -> RepoResult<bool> {
        let mut state = self.state.write();
        match state.users.get_mut(&id) {
            Some(user) if user.recovery_code.as_deref() == Some(expected) => {
                user.recovery_code = Some(replacement.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        self.update(id, |u| {
            u.password_hash = Some(password_hash.to_string());
            u.last_password_change_at = Some(at);
            u.updated_at = at;
        })
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> RepoResult<()> {
        self.update(id, |u| u.last_login_at = Some(at))
    }

    async fn roles_for(&self, id: UserId) -> RepoResult<Vec<String>> {
        Ok(self
            .state
            .read()
            .roles
            .get(&id)
            .map(|roles| roles.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn assign_role(&self, id: UserId, role: &str) -> RepoResult<()> {
        self.state
            .write()
            .roles
            .entry(id)
            .or_default()
            .insert(role.to_string());
        Ok(())
    }
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Default)]
struct SessionState {
    sessions: HashMap<SessionId, Session>,
    /// Insertion order; later entries are newer
    tokens: Vec<RefreshTokenRecord>,
}

impl SessionState {
    fn revoke_tokens_of(&mut self, session_id: SessionId, reason: &RevocationReason, at: DateTime<Utc>) {
        for token in self
            .tokens
            .iter_mut()
            .filter(|t| t.session_id == session_id && !t.is_revoked())
        {
            token.revoked_at = Some(at);
            token.revoked_reason = Some(reason.clone());
        }
    }
}

/// In-memory session and refresh token store.
///
/// Every method runs under one lock, so `replace_refresh_token` has the same
/// all-or-nothing behavior as the database transaction.
#[derive(Default)]
pub struct InMemorySessionRepository {
    state: Mutex<SessionState>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every refresh token of a session in insertion order
    pub fn token_chain(&self, session_id: SessionId) -> Vec<RefreshTokenRecord> {
        self.state
            .lock()
            .tokens
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create_session(
        &self,
        session: &Session,
        token: &RefreshTokenRecord,
    ) -> RepoResult<()> {
        let mut state = self.state.lock();
        state.sessions.insert(session.id, session.clone());
        state.tokens.push(token.clone());
        Ok(())
    }

    async fn find_session(&self, id: SessionId) -> RepoResult<Option<Session>> {
        Ok(self.state.lock().sessions.get(&id).cloned())
    }

    async fn list_active(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        limit: u32,
    ) -> RepoResult<Vec<Session>> {
        let mut active: Vec<Session> = self
            .state
            .lock()
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.is_active(now))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        active.truncate(limit as usize);
        Ok(active)
    }

    async fn revoke_session(
        &self,
        id: SessionId,
        reason: &RevocationReason,
        at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut state = self.state.lock();
        match state.sessions.get_mut(&id) {
            Some(session) if !session.is_revoked() => {
                session.revoked_at = Some(at);
                session.revoked_reason = Some(reason.clone());
            }
            _ => return Ok(false),
        }
        state.revoke_tokens_of(id, reason, at);
        Ok(true)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        exclude: Option<SessionId>,
        reason: &RevocationReason,
        at: DateTime<Utc>,
    ) -> RepoResult<Vec<SessionId>> {
        let mut state = self.state.lock();
        let mut revoked = Vec::new();
        for session in state.sessions.values_mut() {
            if session.user_id == user_id
                && !session.is_revoked()
                && Some(session.id) != exclude
            {
                session.revoked_at = Some(at);
                session.revoked_reason = Some(reason.clone());
                revoked.push(session.id);
            }
        }
        for id in &revoked {
            state.revoke_tokens_of(*id, reason, at);
        }
        Ok(revoked)
    }

    async fn recent_refresh_tokens(
        &self,
        session_id: SessionId,
        limit: u32,
    ) -> RepoResult<Vec<RefreshTokenRecord>> {
        let mut tokens: Vec<RefreshTokenRecord> = self
            .state
            .lock()
            .tokens
            .iter()
            .rev()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        // stable: equal timestamps keep newest-inserted first
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tokens.truncate(limit as usize);
        Ok(tokens)
    }

    async fn replace_refresh_token(
        &self,
        current: RefreshTokenId,
        replacement: &RefreshTokenRecord,
        at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut state = self.state.lock();
        let Some(token) = state
            .tokens
            .iter_mut()
            .find(|t| t.id == current && !t.is_revoked())
        else {
            return Ok(false);
        };
        token.revoked_at = Some(at);
        token.revoked_reason = Some(RevocationReason::Rotated);
        token.replaced_by = Some(replacement.id);
        state.tokens.push(replacement.clone());
        Ok(true)
    }
}

// ============================================================================
// Activity
// ============================================================================

/// In-memory activity log
#[derive(Default)]
pub struct InMemoryActivityRepository {
    entries: RwLock<Vec<ActivityEntry>>,
}

impl InMemoryActivityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivityRepository for InMemoryActivityRepository {
    async fn record(&self, entry: &ActivityEntry) -> RepoResult<()> {
        self.entries.write().push(entry.clone());
        Ok(())
    }

    async fn recent(&self, user_id: UserId, limit: u32) -> RepoResult<Vec<ActivityEntry>> {
        Ok(self
            .entries
            .read()
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Blacklist and attempt limiter
// ============================================================================

/// In-memory token blacklist with expiry measured on the given clock
pub struct InMemoryBlacklist {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl InMemoryBlacklist {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Reason stored for a live entry
    pub fn reason(&self, jti: &str) -> Option<String> {
        let now = self.clock.now();
        self.entries
            .lock()
            .get(jti)
            .filter(|(_, until)| *until > now)
            .map(|(reason, _)| reason.clone())
    }
}

#[async_trait]
impl TokenBlacklist for InMemoryBlacklist {
    async fn add(&self, jti: &str, ttl_secs: u64, reason: &str) -> RepoResult<()> {
        let ttl = i64::try_from(ttl_secs.max(1)).unwrap_or(i64::MAX);
        let until = self.clock.now() + Duration::seconds(ttl);
        self.entries
            .lock()
            .insert(jti.to_string(), (reason.to_string(), until));
        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> RepoResult<bool> {
        Ok(self.reason(jti).is_some())
    }

    async fn remove(&self, jti: &str) -> RepoResult<()> {
        self.entries.lock().remove(jti);
        Ok(())
    }
}

/// In-memory fixed-window attempt limiter
pub struct InMemoryAttemptLimiter {
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, (u32, DateTime<Utc>)>>,
}

impl InMemoryAttemptLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AttemptLimiter for InMemoryAttemptLimiter {
    async fn check_and_increment(
        &self,
        key: &str,
        limit: u32,
        window_secs: u64,
    ) -> RepoResult<AttemptDecision> {
        let now = self.clock.now();
        let mut windows = self.windows.lock();

        if windows.get(key).is_some_and(|(_, ends)| *ends <= now) {
            windows.remove(key);
        }

        if let Some((count, ends)) = windows.get(key) {
            if *count >= limit {
                let remaining = (*ends - now).num_seconds().max(1);
                return Ok(AttemptDecision::Blocked {
                    retry_after_secs: u64::try_from(remaining).unwrap_or(1),
                });
            }
        }

        let window = Duration::seconds(i64::try_from(window_secs).unwrap_or(i64::MAX));
        let entry = windows.entry(key.to_string()).or_insert((0, now + window));
        entry.0 += 1;
        Ok(AttemptDecision::Allowed { attempts: entry.0 })
    }

    async fn reset(&self, key: &str) -> RepoResult<()> {
        self.windows.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// Event sink
// ============================================================================

/// A revocation as seen by a `SessionEventSink`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    SessionRevoked {
        session_id: SessionId,
        reason: RevocationReason,
    },
    UserBulkRevoked {
        user_id: UserId,
        revoked: Vec<SessionId>,
        reason: RevocationReason,
        exclude: Option<SessionId>,
    },
}

/// Event sink that remembers everything it was told
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }
}

impl SessionEventSink for RecordingEventSink {
    fn session_revoked(&self, session_id: SessionId, reason: &RevocationReason) {
        self.events.lock().push(RecordedEvent::SessionRevoked {
            session_id,
            reason: reason.clone(),
        });
    }

    fn user_bulk_revoked(
        &self,
        user_id: UserId,
        revoked: &[SessionId],
        reason: &RevocationReason,
        exclude: Option<SessionId>,
    ) {
        self.events.lock().push(RecordedEvent::UserBulkRevoked {
            user_id,
            revoked: revoked.to_vec(),
            reason: reason.clone(),
            exclude,
        });
    }
}

// ============================================================================
// Test doubles
// ============================================================================

#[cfg(test)]
pub(crate) use doubles::{SnapshotTokenReads, UnavailableBlacklist, UnavailableLimiter};
