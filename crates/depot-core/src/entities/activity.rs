//! Activity log entries - an audit trail of security-relevant account events

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::value_objects::UserId;

/// Audited account action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityAction {
    ProfileUpdate,
    PasswordChange,
    MfaEnabled,
    MfaDisabled,
    SessionRevoke,
    LoginSuccess,
    LoginFailure,
    RefreshReuseDetected,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProfileUpdate => "PROFILE_UPDATE",
            Self::PasswordChange => "PASSWORD_CHANGE",
            Self::MfaEnabled => "MFA_ENABLED",
            Self::MfaDisabled => "MFA_DISABLED",
            Self::SessionRevoke => "SESSION_REVOKE",
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailure => "LOGIN_FAILURE",
            Self::RefreshReuseDetected => "REFRESH_REUSE_DETECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "PROFILE_UPDATE" => Self::ProfileUpdate,
            "PASSWORD_CHANGE" => Self::PasswordChange,
            "MFA_ENABLED" => Self::MfaEnabled,
            "MFA_DISABLED" => Self::MfaDisabled,
            "SESSION_REVOKE" => Self::SessionRevoke,
            "LOGIN_SUCCESS" => Self::LoginSuccess,
            "LOGIN_FAILURE" => Self::LoginFailure,
            "REFRESH_REUSE_DETECTED" => Self::RefreshReuseDetected,
            _ => return None,
        })
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded activity
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub user_id: UserId,
    pub action: ActivityAction,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(
        user_id: UserId,
        action: ActivityAction,
        metadata: Option<Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            action,
            metadata,
            created_at: now,
        }
    }
}
