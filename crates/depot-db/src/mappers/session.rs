//! Session / refresh token entity <-> model mappers

use depot_core::entities::{RefreshTokenRecord, Session};
use depot_core::value_objects::{RefreshTokenId, RevocationReason, SessionId, UserId};

use crate::models::{RefreshTokenModel, SessionModel};

impl From<SessionModel> for Session {
    fn from(model: SessionModel) -> Self {
        Session {
            id: SessionId::from_uuid(model.id),
            user_id: UserId::from_uuid(model.user_id),
            created_at: model.created_at,
            expires_at: model.expires_at,
            ip: model.ip,
            user_agent: model.user_agent,
            revoked_at: model.revoked_at,
            revoked_reason: model.revoked_reason.as_deref().map(RevocationReason::from),
        }
    }
}

impl From<RefreshTokenModel> for RefreshTokenRecord {
    fn from(model: RefreshTokenModel) -> Self {
        RefreshTokenRecord {
            id: RefreshTokenId::from_uuid(model.id),
            session_id: SessionId::from_uuid(model.session_id),
            token_hash: model.token_hash,
            created_at: model.created_at,
            expires_at: model.expires_at,
            ip: model.ip,
            user_agent: model.user_agent,
            revoked_at: model.revoked_at,
            revoked_reason: model.revoked_reason.as_deref().map(RevocationReason::from),
            replaced_by: model.replaced_by.map(RefreshTokenId::from_uuid),
        }
    }
}
