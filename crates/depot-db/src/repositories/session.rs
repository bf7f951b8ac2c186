//! PostgreSQL implementation of SessionRepository
//!
//! Session revocation cascades to the session's refresh tokens inside the same
//! transaction. Rotation uses a conditional update so two callers presenting
//! the same refresh secret cannot both replace it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use depot_core::entities::{RefreshTokenRecord, Session};
use depot_core::traits::{RepoResult, SessionRepository};
use depot_core::value_objects::{RefreshTokenId, RevocationReason, SessionId, UserId};

use crate::models::{RefreshTokenModel, SessionModel};

use super::error::map_db_error;

const SESSION_COLUMNS: &str =
    "id, user_id, created_at, expires_at, ip, user_agent, revoked_at, revoked_reason";

/// PostgreSQL implementation of SessionRepository
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new PgSessionRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_refresh_token(
    tx: &mut Transaction<'_, Postgres>,
    token: &RefreshTokenRecord,
) -> RepoResult<()> {
    sqlx::query(
        r"
        INSERT INTO refresh_tokens (id, session_id, token_hash, created_at, expires_at, ip,
                                    user_agent, revoked_at, revoked_reason, replaced_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ",
    )
    .bind(token.id.into_inner())
    .bind(token.session_id.into_inner())
    .bind(&token.token_hash)
    .bind(token.created_at)
    .bind(token.expires_at)
    .bind(&token.ip)
    .bind(&token.user_agent)
    .bind(token.revoked_at)
    .bind(token.revoked_reason.as_ref().map(RevocationReason::as_str))
    .bind(token.replaced_by.map(RefreshTokenId::into_inner))
    .execute(&mut **tx)
    .await
    .map_err(map_db_error)?;

    Ok(())
}

async fn revoke_tokens_of(
    tx: &mut Transaction<'_, Postgres>,
    session_ids: &[Uuid],
    reason: &RevocationReason,
    at: DateTime<Utc>,
) -> RepoResult<u64> {
    let result = sqlx::query(
        r"
        UPDATE refresh_tokens
        SET revoked_at = $2, revoked_reason = $3
        WHERE session_id = ANY($1) AND revoked_at IS NULL
        ",
    )
    .bind(session_ids)
    .bind(at)
    .bind(reason.as_str())
    .execute(&mut **tx)
    .await
    .map_err(map_db_error)?;

    Ok(result.rows_affected())
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    #[instrument(skip(self, session, token), fields(session_id = %session.id, user_id = %session.user_id))]
    async fn create_session(
        &self,
        session: &Session,
        token: &RefreshTokenRecord,
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            r"
            INSERT INTO sessions (id, user_id, created_at, expires_at, ip, user_agent,
                                  revoked_at, revoked_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(session.id.into_inner())
        .bind(session.user_id.into_inner())
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(&session.ip)
        .bind(&session.user_agent)
        .bind(session.revoked_at)
        .bind(session.revoked_reason.as_ref().map(RevocationReason::as_str))
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        insert_refresh_token(&mut tx, token).await?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_session(&self, id: SessionId) -> RepoResult<Option<Session>> {
        let result = sqlx::query_as::<_, SessionModel>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Session::from))
    }

    #[instrument(skip(self))]
    async fn list_active(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        limit: u32,
    ) -> RepoResult<Vec<Session>> {
        let results = sqlx::query_as::<_, SessionModel>(&format!(
            r"
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > $2
            ORDER BY created_at DESC
            LIMIT $3
            "
        ))
        .bind(user_id.into_inner())
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Session::from).collect())
    }

    #[instrument(skip(self), fields(reason = %reason))]
    async fn revoke_session(
        &self,
        id: SessionId,
        reason: &RevocationReason,
        at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let result = sqlx::query(
            r"
            UPDATE sessions
            SET revoked_at = $2, revoked_reason = $3
            WHERE id = $1 AND revoked_at IS NULL
            ",
        )
        .bind(id.into_inner())
        .bind(at)
        .bind(reason.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(false);
        }

        let tokens = revoke_tokens_of(&mut tx, &[id.into_inner()], reason, at).await?;
        tx.commit().await.map_err(map_db_error)?;

        debug!(tokens, "Session revoked");
        Ok(true)
    }

    #[instrument(skip(self), fields(reason = %reason))]
    async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        exclude: Option<SessionId>,
        reason: &RevocationReason,
        at: DateTime<Utc>,
    ) -> RepoResult<Vec<SessionId>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let revoked = sqlx::query_scalar::<_, Uuid>(
            r"
            UPDATE sessions
            SET revoked_at = $3, revoked_reason = $4
            WHERE user_id = $1
              AND revoked_at IS NULL
              AND ($2::uuid IS NULL OR id <> $2)
            RETURNING id
            ",
        )
        .bind(user_id.into_inner())
        .bind(exclude.map(SessionId::into_inner))
        .bind(at)
        .bind(reason.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if !revoked.is_empty() {
            revoke_tokens_of(&mut tx, &revoked, reason, at).await?;
        }
        tx.commit().await.map_err(map_db_error)?;

        Ok(revoked.into_iter().map(SessionId::from_uuid).collect())
    }

    #[instrument(skip(self))]
    async fn recent_refresh_tokens(
        &self,
        session_id: SessionId,
        limit: u32,
    ) -> RepoResult<Vec<RefreshTokenRecord>> {
        let results = sqlx::query_as::<_, RefreshTokenModel>(
            r"
            SELECT id, session_id, token_hash, created_at, expires_at, ip, user_agent,
                   revoked_at, revoked_reason, replaced_by
            FROM refresh_tokens
            WHERE session_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(session_id.into_inner())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(RefreshTokenRecord::from).collect())
    }

    #[instrument(skip(self, replacement), fields(session_id = %replacement.session_id))]
    async fn replace_refresh_token(
        &self,
        current: RefreshTokenId,
        replacement: &RefreshTokenRecord,
        at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // The successor must exist before the predecessor can reference it
        insert_refresh_token(&mut tx, replacement).await?;

        let result = sqlx::query(
            r"
            UPDATE refresh_tokens
            SET revoked_at = $2, revoked_reason = $3, replaced_by = $4
            WHERE id = $1 AND revoked_at IS NULL
            ",
        )
        .bind(current.into_inner())
        .bind(at)
        .bind(RevocationReason::Rotated.as_str())
        .bind(replacement.id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(false);
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(true)
    }
}
