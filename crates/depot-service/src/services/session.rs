//! Session service
//!
//! Owns the login session state machine: opening a session with its first
//! refresh token, rotating refresh tokens with reuse detection, revoking one
//! or all sessions, and listing what is still active.
//!
//! A session moves from active to revoked and never back. Each refresh token
//! is current until it is rotated (pointing `replaced_by` at its successor)
//! or revoked with its session.

use chrono::{DateTime, Utc};
use depot_core::entities::{ActivityAction, ClientInfo, RefreshTokenRecord, Session};
use depot_core::{DomainError, RefreshArtifact, RevocationReason, SessionId, UserId};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::dto::SessionResponse;

use super::activity::ActivityService;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Random bytes in a refresh secret
pub const REFRESH_SECRET_BYTES: usize = 48;

/// A freshly opened session
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session_id: SessionId,
    pub refresh_artifact: RefreshArtifact,
    pub expires_at: DateTime<Utc>,
}

/// The successor of a rotated refresh token
#[derive(Debug, Clone)]
pub struct RotatedSession {
    pub refresh_artifact: RefreshArtifact,
    pub expires_at: DateTime<Utc>,
}

/// Session service
pub struct SessionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> SessionService<'a> {
    /// Create a new SessionService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Open a session and its first refresh token in one write
    #[instrument(skip(self, client), fields(user_id = %user_id))]
    pub async fn create_session(
        &self,
        user_id: UserId,
        client: &ClientInfo,
    ) -> ServiceResult<CreatedSession> {
        let now = self.ctx.now();
        let session = Session::open(user_id, client, now, self.ctx.settings().refresh_ttl);

        let secret = self.ctx.random_hex(REFRESH_SECRET_BYTES);
        let token_hash = self.ctx.hash_secret(secret.clone()).await?;
        let token = RefreshTokenRecord::new(&session, token_hash, now, session.expires_at);

        self.ctx.session_repo().create_session(&session, &token).await?;

        info!(session_id = %session.id, "Session created");

        Ok(CreatedSession {
            session_id: session.id,
            refresh_artifact: RefreshArtifact::new(session.id, secret),
            expires_at: session.expires_at,
        })
    }

    /// Exchange the presented refresh artifact for a new one.
    ///
    /// Every failure surfaces as `InvalidToken` except an unknown or foreign
    /// session. A prefix mismatch or a secret that is not the current token
    /// revokes the whole session. Losing a race against a concurrent rotation
    /// of the same token does not.
    #[instrument(skip(self, presented), fields(user_id = %user_id, session_id = %session_id))]
    pub async fn rotate(
        &self,
        user_id: UserId,
        session_id: SessionId,
        presented: &str,
    ) -> ServiceResult<RotatedSession> {
        let now = self.ctx.now();
        let session = self.owned_session(user_id, session_id).await?;
        if !session.is_active(now) {
            debug!("Rotation refused: session no longer active");
            return Err(ServiceError::invalid_token());
        }

        let Some(artifact) = RefreshArtifact::parse(presented) else {
            return Err(ServiceError::invalid_token());
        };
        if !artifact.belongs_to(session_id) {
            warn!(prefix = artifact.prefix(), "Refresh token prefix does not match session");
            self.revoke(user_id, session_id, RevocationReason::InvalidPrefix)
                .await?;
            return Err(ServiceError::invalid_token());
        }

        let recent = self
            .ctx
            .session_repo()
            .recent_refresh_tokens(session_id, self.ctx.settings().reuse_lookback)
            .await?;
        let hashes = recent.iter().map(|t| t.token_hash.clone()).collect();
        let matched = self
            .ctx
            .find_matching_hash(artifact.secret().to_string(), hashes)
            .await?
            .and_then(|i| recent.get(i));

        let Some(current) = matched else {
            self.reuse_detected(user_id, session_id, RevocationReason::InvalidOrReuse)
                .await?;
            return Err(ServiceError::invalid_token());
        };
        if !current.is_current(now) {
            self.reuse_detected(user_id, session_id, RevocationReason::ReuseDetected)
                .await?;
            return Err(ServiceError::invalid_token());
        }

        let secret = self.ctx.random_hex(REFRESH_SECRET_BYTES);
        let token_hash = self.ctx.hash_secret(secret.clone()).await?;
        // the session's own expiry is never extended
        let expires_at = (now + self.ctx.settings().refresh_ttl).min(session.expires_at);
        let replacement = RefreshTokenRecord::new(&session, token_hash, now, expires_at);

        let replaced = self
            .ctx
            .session_repo()
            .replace_refresh_token(current.id, &replacement, now)
            .await?;
        if !replaced {
            warn!(token_id = %current.id, "Refresh token already rotated by a concurrent request");
            return Err(ServiceError::invalid_token());
        }

        debug!(token_id = %replacement.id, "Refresh token rotated");

        Ok(RotatedSession {
            refresh_artifact: RefreshArtifact::new(session_id, secret),
            expires_at,
        })
    }

    /// Revoke one session of a user. Revoking an already revoked session is a no-op.
    #[instrument(skip(self), fields(user_id = %user_id, session_id = %session_id, reason = %reason))]
    pub async fn revoke(
        &self,
        user_id: UserId,
        session_id: SessionId,
        reason: RevocationReason,
    ) -> ServiceResult<()> {
        let session = self.owned_session(user_id, session_id).await?;
        if session.is_revoked() {
            debug!("Session already revoked");
            return Ok(());
        }

        let revoked = self
            .ctx
            .session_repo()
            .revoke_session(session_id, &reason, self.ctx.now())
            .await?;
        if !revoked {
            debug!("Session revoked concurrently");
            return Ok(());
        }

        info!("Session revoked");

        ActivityService::new(self.ctx)
            .log(
                user_id,
                ActivityAction::SessionRevoke,
                Some(json!({ "session_id": session_id, "reason": reason.as_str() })),
            )
            .await;
        self.ctx.events().session_revoked(session_id, &reason);

        Ok(())
    }

    /// Revoke every session of a user except `exclude`. Returns how many were revoked.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn revoke_all(
        &self,
        user_id: UserId,
        exclude: Option<SessionId>,
        reason: Option<RevocationReason>,
    ) -> ServiceResult<usize> {
        let reason = reason.unwrap_or(RevocationReason::Bulk);
        let revoked = self
            .ctx
            .session_repo()
            .revoke_all_for_user(user_id, exclude, &reason, self.ctx.now())
            .await?;

        info!(count = revoked.len(), reason = %reason, "Sessions revoked in bulk");

        ActivityService::new(self.ctx)
            .log(
                user_id,
                ActivityAction::SessionRevoke,
                Some(json!({ "bulk": true, "count": revoked.len(), "reason": reason.as_str() })),
            )
            .await;
        if !revoked.is_empty() {
            self.ctx
                .events()
                .user_bulk_revoked(user_id, &revoked, &reason, exclude);
        }

        Ok(revoked.len())
    }

    /// Active sessions of a user, newest first
    #[instrument(skip(self))]
    pub async fn list(&self, user_id: UserId) -> ServiceResult<Vec<Session>> {
        Ok(self
            .ctx
            .session_repo()
            .list_active(user_id, self.ctx.now(), self.ctx.settings().session_list_limit)
            .await?)
    }

    /// Active sessions decorated for the device list
    pub async fn list_devices(
        &self,
        user_id: UserId,
        current: Option<SessionId>,
    ) -> ServiceResult<Vec<SessionResponse>> {
        let now = self.ctx.now();
        Ok(self
            .list(user_id)
            .await?
            .iter()
            .map(|s| SessionResponse::from_session(s, current, now))
            .collect())
    }

    /// Look up a session by id regardless of owner or state
    pub async fn find(&self, session_id: SessionId) -> ServiceResult<Session> {
        self.ctx
            .session_repo()
            .find_session(session_id)
            .await?
            .ok_or_else(|| DomainError::SessionNotFound(session_id).into())
    }

    async fn owned_session(&self, user_id: UserId, session_id: SessionId) -> ServiceResult<Session> {
        self.ctx
            .session_repo()
            .find_session(session_id)
            .await?
            .filter(|s| s.is_owned_by(user_id))
            .ok_or_else(|| DomainError::SessionNotFound(session_id).into())
    }

    async fn reuse_detected(
        &self,
        user_id: UserId,
        session_id: SessionId,
        reason: RevocationReason,
    ) -> ServiceResult<()> {
        warn!(
            user_id = %user_id,
            session_id = %session_id,
            reason = %reason,
            "Refresh token reuse detected, revoking session"
        );
        let metadata = json!({ "session_id": session_id, "reason": reason.as_str() });
        self.revoke(user_id, session_id, reason).await?;
        ActivityService::new(self.ctx)
            .log(user_id, ActivityAction::RefreshReuseDetected, Some(metadata))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::Duration;
    use depot_core::traits::SessionRepository;
    use depot_core::SessionStatus;

    use super::*;
    use crate::memory::{RecordedEvent, SnapshotTokenReads};
    use crate::services::test_support::Harness;

    fn client() -> ClientInfo {
        ClientInfo::new(Some("10.1.1.1".into()), Some("unit-test".into()))
    }

    async fn open(h: &Harness) -> (UserId, CreatedSession) {
        let user_id = UserId::new();
        let created = SessionService::new(&h.ctx)
            .create_session(user_id, &client())
            .await
            .unwrap();
        (user_id, created)
    }

    async fn status_of(h: &Harness, session_id: SessionId) -> SessionStatus {
        let session = h.sessions.find_session(session_id).await.unwrap().unwrap();
        session.status(h.ctx.now())
    }

    #[tokio::test]
    async fn test_create_session_stores_only_the_hash() {
        let h = Harness::new();
        let (_, created) = open(&h).await;

        assert!(created.refresh_artifact.belongs_to(created.session_id));
        assert_eq!(created.refresh_artifact.secret().len(), REFRESH_SECRET_BYTES * 2);

        let chain = h.sessions.token_chain(created.session_id);
        assert_eq!(chain.len(), 1);
        assert_ne!(chain[0].token_hash, created.refresh_artifact.secret());
        assert_eq!(chain[0].ip.as_deref(), Some("10.1.1.1"));
        assert_eq!(chain[0].expires_at, created.expires_at);
    }

    #[tokio::test]
    async fn test_rotate_keeps_prefix_and_changes_secret() {
        let h = Harness::new();
        let (user_id, created) = open(&h).await;
        let service = SessionService::new(&h.ctx);

        let rotated = service
            .rotate(user_id, created.session_id, &created.refresh_artifact.to_string())
            .await
            .unwrap();

        assert_eq!(rotated.refresh_artifact.prefix(), created.refresh_artifact.prefix());
        assert_ne!(rotated.refresh_artifact.secret(), created.refresh_artifact.secret());
        assert_eq!(status_of(&h, created.session_id).await, SessionStatus::Active);

        let chain = h.sessions.token_chain(created.session_id);
        assert_eq!(chain[0].revoked_reason, Some(RevocationReason::Rotated));
        assert_eq!(chain[0].replaced_by, Some(chain[1].id));
        assert!(chain[1].is_current(h.ctx.now()));
    }

    #[tokio::test]
    async fn test_replaying_a_rotated_token_revokes_the_session() {
        let h = Harness::new();
        let (user_id, created) = open(&h).await;
        let service = SessionService::new(&h.ctx);
        let old = created.refresh_artifact.to_string();

        let rotated = service.rotate(user_id, created.session_id, &old).await.unwrap();

        let err = service.rotate(user_id, created.session_id, &old).await.unwrap_err();
        assert!(err.is_invalid_token());
        assert_eq!(status_of(&h, created.session_id).await, SessionStatus::Revoked);

        let session = h.sessions.find_session(created.session_id).await.unwrap().unwrap();
        assert_eq!(session.revoked_reason, Some(RevocationReason::ReuseDetected));

        // the newest artifact dies with the session
        let err = service
            .rotate(user_id, created.session_id, &rotated.refresh_artifact.to_string())
            .await
            .unwrap_err();
        assert!(err.is_invalid_token());

        let actions: Vec<_> = h
            .activity_for(user_id)
            .await
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert!(actions.contains(&ActivityAction::RefreshReuseDetected));
        assert!(actions.contains(&ActivityAction::SessionRevoke));
    }

    #[tokio::test]
    async fn test_unknown_secret_revokes_as_invalid_or_reuse() {
        let h = Harness::new();
        let (user_id, created) = open(&h).await;
        let forged = RefreshArtifact::new(created.session_id, "00".repeat(48));

        let err = SessionService::new(&h.ctx)
            .rotate(user_id, created.session_id, &forged.to_string())
            .await
            .unwrap_err();
        assert!(err.is_invalid_token());

        let session = h.sessions.find_session(created.session_id).await.unwrap().unwrap();
        assert_eq!(session.revoked_reason, Some(RevocationReason::InvalidOrReuse));
        assert_eq!(
            h.events.events(),
            vec![RecordedEvent::SessionRevoked {
                session_id: created.session_id,
                reason: RevocationReason::InvalidOrReuse,
            }]
        );
    }

    #[tokio::test]
    async fn test_foreign_prefix_revokes_looked_up_session() {
        let h = Harness::new();
        let (user_id, created) = open(&h).await;
        let foreign = RefreshArtifact::new(SessionId::new(), created.refresh_artifact.secret());

        let err = SessionService::new(&h.ctx)
            .rotate(user_id, created.session_id, &foreign.to_string())
            .await
            .unwrap_err();
        assert!(err.is_invalid_token());

        let session = h.sessions.find_session(created.session_id).await.unwrap().unwrap();
        assert_eq!(session.revoked_reason, Some(RevocationReason::InvalidPrefix));
    }

    #[tokio::test]
    async fn test_upper_case_prefix_is_not_the_session_id() {
        let h = Harness::new();
        let (user_id, created) = open(&h).await;
        let shouted = format!(
            "{}.{}",
            created.session_id.to_string().to_uppercase(),
            created.refresh_artifact.secret()
        );

        let err = SessionService::new(&h.ctx)
            .rotate(user_id, created.session_id, &shouted)
            .await
            .unwrap_err();
        assert!(err.is_invalid_token());

        let session = h.sessions.find_session(created.session_id).await.unwrap().unwrap();
        assert_eq!(session.revoked_reason, Some(RevocationReason::InvalidPrefix));
    }

    #[tokio::test]
    async fn test_artifact_without_separator_is_rejected_without_revoking() {
        let h = Harness::new();
        let (user_id, created) = open(&h).await;

        let err = SessionService::new(&h.ctx)
            .rotate(user_id, created.session_id, created.refresh_artifact.secret())
            .await
            .unwrap_err();
        assert!(err.is_invalid_token());
        assert_eq!(status_of(&h, created.session_id).await, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_rotate_someone_elses_session_is_not_found() {
        let h = Harness::new();
        let (_, created) = open(&h).await;

        let err = SessionService::new(&h.ctx)
            .rotate(UserId::new(), created.session_id, &created.refresh_artifact.to_string())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(status_of(&h, created.session_id).await, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_rotate_expired_session_is_invalid() {
        let h = Harness::new();
        let (user_id, created) = open(&h).await;
        h.clock.advance(Duration::days(8));

        let err = SessionService::new(&h.ctx)
            .rotate(user_id, created.session_id, &created.refresh_artifact.to_string())
            .await
            .unwrap_err();
        assert!(err.is_invalid_token());
    }

    #[tokio::test]
    async fn test_successor_never_outlives_the_session() {
        let h = Harness::new();
        let (user_id, created) = open(&h).await;
        h.clock.advance(Duration::days(6));

        let rotated = SessionService::new(&h.ctx)
            .rotate(user_id, created.session_id, &created.refresh_artifact.to_string())
            .await
            .unwrap();
        assert_eq!(rotated.expires_at, created.expires_at);

        let session = h.sessions.find_session(created.session_id).await.unwrap().unwrap();
        assert_eq!(session.expires_at, created.expires_at);
    }

    #[tokio::test]
    async fn test_replaced_by_chain_is_a_simple_path() {
        let h = Harness::new();
        let (user_id, created) = open(&h).await;
        let service = SessionService::new(&h.ctx);

        let mut artifact = created.refresh_artifact.to_string();
        for _ in 0..4 {
            h.clock.advance(Duration::seconds(1));
            artifact = service
                .rotate(user_id, created.session_id, &artifact)
                .await
                .unwrap()
                .refresh_artifact
                .to_string();
        }

        let chain = h.sessions.token_chain(created.session_id);
        assert_eq!(chain.len(), 5);
        let mut seen = HashSet::new();
        for pair in chain.windows(2) {
            assert_eq!(pair[0].replaced_by, Some(pair[1].id));
            assert!(seen.insert(pair[1].id));
        }
        assert_eq!(chain.last().and_then(|t| t.replaced_by), None);
        assert_eq!(chain.iter().filter(|t| t.is_current(h.ctx.now())).count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_rotations_exactly_one_wins() {
        let h = Harness::with_session_repo(|inner| Arc::new(SnapshotTokenReads::new(inner)));
        let (user_id, created) = open(&h).await;
        let service = SessionService::new(&h.ctx);
        let artifact = created.refresh_artifact.to_string();

        let (a, b) = tokio::join!(
            service.rotate(user_id, created.session_id, &artifact),
            service.rotate(user_id, created.session_id, &artifact),
        );

        let outcomes = [a.is_ok(), b.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let loser = if a.is_ok() { b.unwrap_err() } else { a.unwrap_err() };
        assert!(loser.is_invalid_token());

        assert_eq!(status_of(&h, created.session_id).await, SessionStatus::Active);
        assert_eq!(h.sessions.token_chain(created.session_id).len(), 2);
        assert!(h.events.events().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let h = Harness::new();
        let (user_id, created) = open(&h).await;
        let service = SessionService::new(&h.ctx);

        service
            .revoke(user_id, created.session_id, RevocationReason::UserRevoked)
            .await
            .unwrap();
        service
            .revoke(user_id, created.session_id, RevocationReason::Logout)
            .await
            .unwrap();

        let session = h.sessions.find_session(created.session_id).await.unwrap().unwrap();
        assert_eq!(session.revoked_reason, Some(RevocationReason::UserRevoked));
        assert_eq!(h.events.events().len(), 1);
        assert!(h
            .sessions
            .token_chain(created.session_id)
            .iter()
            .all(RefreshTokenRecord::is_revoked));
    }

    #[tokio::test]
    async fn test_revoke_foreign_session_is_not_found() {
        let h = Harness::new();
        let (_, created) = open(&h).await;

        let err = SessionService::new(&h.ctx)
            .revoke(UserId::new(), created.session_id, RevocationReason::UserRevoked)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_SESSION");
    }

    #[tokio::test]
    async fn test_revoke_all_spares_excluded_session() {
        let h = Harness::new();
        let service = SessionService::new(&h.ctx);
        let user_id = UserId::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            h.clock.advance(Duration::seconds(1));
            ids.push(service.create_session(user_id, &client()).await.unwrap());
        }
        let keep = &ids[0];

        let count = service
            .revoke_all(user_id, Some(keep.session_id), None)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let active = service.list(user_id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.session_id);

        // the kept chain is still usable
        service
            .rotate(user_id, keep.session_id, &keep.refresh_artifact.to_string())
            .await
            .unwrap();

        match h.events.events().as_slice() {
            [RecordedEvent::UserBulkRevoked {
                revoked,
                reason,
                exclude,
                ..
            }] => {
                assert_eq!(revoked.len(), 2);
                assert_eq!(*reason, RevocationReason::Bulk);
                assert_eq!(*exclude, Some(keep.session_id));
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_marks_current() {
        let h = Harness::new();
        let service = SessionService::new(&h.ctx);
        let user_id = UserId::new();
        let first = service.create_session(user_id, &client()).await.unwrap();
        h.clock.advance(Duration::minutes(1));
        let second = service.create_session(user_id, &client()).await.unwrap();

        let devices = service
            .list_devices(user_id, Some(first.session_id))
            .await
            .unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, second.session_id);
        assert!(!devices[0].is_current);
        assert!(devices[1].is_current);
        assert_eq!(devices[1].status, "active");
        assert_eq!(devices[1].device.device.as_deref(), Some("Desktop"));
    }
}
