//! Session and refresh token entities
//!
//! A session is one login on one device. Each session owns a linear chain of
//! refresh token records; rotating a token revokes it and points `replaced_by`
//! at its successor.

use chrono::{DateTime, Duration, Utc};

use crate::value_objects::{RefreshTokenId, RevocationReason, SessionId, UserId};

/// Client details captured when a session is opened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip: Option<String>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }
}

/// Login session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<RevocationReason>,
}

impl Session {
    /// Open a session that lives for `ttl` from `now`
    pub fn open(user_id: UserId, client: &ClientInfo, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            revoked_at: None,
            revoked_reason: None,
        }
    }

    #[inline]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Active iff not revoked and not expired
    #[inline]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired(now)
    }

    #[inline]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    pub fn status(&self, now: DateTime<Utc>) -> SessionStatus {
        if self.is_revoked() {
            SessionStatus::Revoked
        } else if self.is_expired(now) {
            SessionStatus::Expired
        } else {
            SessionStatus::Active
        }
    }

    /// Client details recorded for this session
    pub fn client(&self) -> ClientInfo {
        ClientInfo::new(self.ip.clone(), self.user_agent.clone())
    }
}

/// Lifecycle status shown in session listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Revoked,
    Expired,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        }
    }
}

/// One link in a session's refresh token chain. Only the hash of the secret is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: RefreshTokenId,
    pub session_id: SessionId,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<RevocationReason>,
    pub replaced_by: Option<RefreshTokenId>,
}

impl RefreshTokenRecord {
    pub fn new(
        session: &Session,
        token_hash: String,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RefreshTokenId::new(),
            session_id: session.id,
            token_hash,
            created_at: now,
            expires_at,
            ip: session.ip.clone(),
            user_agent: session.user_agent.clone(),
            revoked_at: None,
            revoked_reason: None,
            replaced_by: None,
        }
    }

    #[inline]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Usable for a rotation
    #[inline]
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired(now)
    }
}
