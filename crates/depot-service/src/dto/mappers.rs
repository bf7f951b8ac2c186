//! Entity to DTO mappers
//!
//! Implements conversions from domain entities to response DTOs.

use chrono::{DateTime, Utc};
use depot_core::entities::{ActivityEntry, Session};
use depot_core::SessionId;

use super::responses::{ActivityResponse, SessionResponse};
use crate::user_agent::summarize;

// ============================================================================
// Session Mappers
// ============================================================================

impl SessionResponse {
    /// Device view of a session from the point of view of `current`
    pub fn from_session(session: &Session, current: Option<SessionId>, now: DateTime<Utc>) -> Self {
        Self {
            id: session.id,
            created_at: session.created_at,
            expires_at: session.expires_at,
            ip: session.ip.clone(),
            user_agent: session.user_agent.clone(),
            revoked_at: session.revoked_at,
            revoked_reason: session.revoked_reason.as_ref().map(ToString::to_string),
            device: summarize(session.user_agent.as_deref().unwrap_or_default()),
            is_current: current == Some(session.id),
            status: session.status(now).as_str(),
        }
    }
}

// ============================================================================
// Activity Mappers
// ============================================================================

impl From<&ActivityEntry> for ActivityResponse {
    fn from(entry: &ActivityEntry) -> Self {
        Self {
            id: entry.id,
            action: entry.action.as_str(),
            metadata: entry.metadata.clone(),
            created_at: entry.created_at,
        }
    }
}

impl From<ActivityEntry> for ActivityResponse {
    fn from(entry: ActivityEntry) -> Self {
        Self::from(&entry)
    }
}
