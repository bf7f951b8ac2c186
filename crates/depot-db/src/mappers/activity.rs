//! Activity entry <-> model mapper

use depot_core::entities::{ActivityAction, ActivityEntry};
use depot_core::error::DomainError;
use depot_core::value_objects::UserId;

use crate::models::ActivityModel;

impl TryFrom<ActivityModel> for ActivityEntry {
    type Error = DomainError;

    fn try_from(model: ActivityModel) -> Result<Self, Self::Error> {
        let action = ActivityAction::parse(&model.action).ok_or_else(|| {
            DomainError::DatabaseError(format!("unknown activity action '{}'", model.action))
        })?;

        Ok(ActivityEntry {
            id: model.id,
            user_id: UserId::from_uuid(model.user_id),
            action,
            metadata: model.metadata,
            created_at: model.created_at,
        })
    }
}
