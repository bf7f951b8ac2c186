//! User entity - an account that can open login sessions

use chrono::{DateTime, Utc};

use crate::value_objects::UserId;

/// Role every new account receives
pub const DEFAULT_ROLE: &str = "USER";

/// User account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: Option<String>,
    /// Base32-encoded OTP secret
    pub otp_secret: Option<String>,
    pub otp_enabled: bool,
    pub recovery_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_password_change_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new account with an OTP secret and recovery code already provisioned
    pub fn new(
        username: String,
        otp_secret: String,
        recovery_code: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            username,
            password_hash: None,
            otp_secret: Some(otp_secret),
            otp_enabled: false,
            recovery_code: Some(recovery_code),
            created_at: now,
            updated_at: now,
            last_login_at: None,
            last_password_change_at: None,
        }
    }

    #[inline]
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Compare a presented recovery code against the stored one
    pub fn recovery_code_matches(&self, presented: &str) -> bool {
        match &self.recovery_code {
            Some(code) => !presented.is_empty() && code == presented,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new(
            "alice".to_string(),
            "JBSWY3DPEHPK3PXP".to_string(),
            "ABCD1234".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_new_user_defaults() {
        let user = user();
        assert!(!user.otp_enabled);
        assert!(!user.has_password());
        assert!(user.last_login_at.is_none());
    }

    #[test]
    fn test_recovery_code_matches() {
        let mut user = user();
        assert!(user.recovery_code_matches("ABCD1234"));
        assert!(!user.recovery_code_matches("abcd1234"));
        assert!(!user.recovery_code_matches(""));

        user.recovery_code = None;
        assert!(!user.recovery_code_matches("ABCD1234"));
    }
}
