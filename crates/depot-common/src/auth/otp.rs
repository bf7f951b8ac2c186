//! TOTP verification and enrollment (RFC 6238: SHA1, 6 digits, 30 second step)

use chrono::{DateTime, Utc};
use depot_core::{DomainError, OtpProvisioning, OtpVerifier};
use totp_rs::{Algorithm, Secret, TOTP};

const DIGITS: usize = 6;
const STEP_SECS: u64 = 30;
/// Accept codes up to two steps before or after the current one
const DEFAULT_SKEW: u8 = 2;

/// `totp-rs` backed implementation of the `OtpVerifier` port
#[derive(Debug, Clone)]
pub struct TotpVerifier {
    issuer: String,
    skew: u8,
}

impl TotpVerifier {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            skew: DEFAULT_SKEW,
        }
    }

    fn totp(&self, secret: &str, account: &str) -> Option<TOTP> {
        let bytes = Secret::Encoded(secret.trim().to_uppercase()).to_bytes().ok()?;
        Some(TOTP::new_unchecked(
            Algorithm::SHA1,
            DIGITS,
            self.skew,
            STEP_SECS,
            bytes,
            Some(self.issuer.clone()),
            account.replace(':', "_"),
        ))
    }

    /// The code an authenticator app would show at `now`
    pub fn code_at(&self, secret: &str, now: DateTime<Utc>) -> Option<String> {
        let ts = u64::try_from(now.timestamp()).ok()?;
        Some(self.totp(secret, "depot")?.generate(ts))
    }
}

impl OtpVerifier for TotpVerifier {
    fn generate_secret(&self) -> String {
        Secret::generate_secret().to_encoded().to_string()
    }

    fn verify(&self, secret: &str, code: &str, now: DateTime<Utc>) -> bool {
        let code = code.trim();
        if code.len() != DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        let Ok(ts) = u64::try_from(now.timestamp()) else {
            return false;
        };
        self.totp(secret, "depot")
            .is_some_and(|totp| totp.check(code, ts))
    }

    fn provisioning(&self, secret: &str, account: &str) -> Result<OtpProvisioning, DomainError> {
        let totp = self
            .totp(secret, account)
            .ok_or_else(|| DomainError::InternalError("stored OTP secret is not base32".into()))?;
        let png = totp
            .get_qr_base64()
            .map_err(|e| DomainError::InternalError(format!("QR generation failed: {e}")))?;

        Ok(OtpProvisioning {
            otpauth_url: totp.get_url(),
            qr_code: format!("data:image/png;base64,{png}"),
        })
    }
}
