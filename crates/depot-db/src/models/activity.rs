//! Activity log database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for user_activity_logs table
#[derive(Debug, Clone, FromRow)]
pub struct ActivityModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
