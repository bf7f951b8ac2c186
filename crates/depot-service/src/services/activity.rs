//! Activity log service
//!
//! Records security-relevant events per user. Recording never fails the
//! caller; a store error is logged and dropped.

use depot_core::entities::{ActivityAction, ActivityEntry};
use depot_core::UserId;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::dto::ActivityResponse;

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Activity log service
pub struct ActivityService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ActivityService<'a> {
    /// Create a new ActivityService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Append an entry, swallowing store failures
    #[instrument(skip(self, metadata), fields(action = %action))]
    pub async fn log(&self, user_id: UserId, action: ActivityAction, metadata: Option<Value>) {
        let entry = ActivityEntry::new(user_id, action, metadata, self.ctx.now());
        if let Err(e) = self.ctx.activity_repo().record(&entry).await {
            warn!(user_id = %user_id, error = %e, "Failed to record activity");
        }
    }

    /// Newest entries for a user
    #[instrument(skip(self))]
    pub async fn list(&self, user_id: UserId) -> ServiceResult<Vec<ActivityResponse>> {
        let limit = self.ctx.settings().activity_list_limit;
        let entries = self.ctx.activity_repo().recent(user_id, limit).await?;
        Ok(entries.iter().map(ActivityResponse::from).collect())
    }
}
