//! PostgreSQL implementation of ActivityRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use depot_core::entities::ActivityEntry;
use depot_core::traits::{ActivityRepository, RepoResult};
use depot_core::value_objects::UserId;

use crate::models::ActivityModel;

use super::error::map_db_error;

/// PostgreSQL implementation of ActivityRepository
#[derive(Clone)]
pub struct PgActivityRepository {
    pool: PgPool,
}

impl PgActivityRepository {
    /// Create a new PgActivityRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    #[instrument(skip(self, entry), fields(user_id = %entry.user_id, action = %entry.action))]
    async fn record(&self, entry: &ActivityEntry) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO user_activity_logs (id, user_id, action, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(entry.id)
        .bind(entry.user_id.into_inner())
        .bind(entry.action.as_str())
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(&self, user_id: UserId, limit: u32) -> RepoResult<Vec<ActivityEntry>> {
        let results = sqlx::query_as::<_, ActivityModel>(
            r"
            SELECT id, user_id, action, metadata, created_at
            FROM user_activity_logs
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(user_id.into_inner())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(ActivityEntry::try_from).collect()
    }
}
