//! Access token issuing and verification
//!
//! Access tokens are HS256 JWTs bound to a login session through the `sid`
//! claim. Secrets come from a key ring so keys can be rotated: the `kid`
//! header selects the verification secret.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use depot_core::{Clock, RandomSource, SessionId, UserId};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::random::random_hex;
use crate::config::JwtConfig;
use crate::error::AppError;

/// Bytes of randomness in a token identifier
const JTI_BYTES: usize = 16;

// ============================================================================
// Key ring
// ============================================================================

/// Signing secrets keyed by `kid`
///
/// Parsed from either a single secret or `kid=secret` entries separated by
/// `;` or `,`. The raw value doubles as the `default` key unless an explicit
/// `default` entry exists.
#[derive(Clone)]
pub struct KeyRing {
    keys: HashMap<String, String>,
}

impl KeyRing {
    pub const DEFAULT_KID: &'static str = "default";

    pub fn parse(raw: &str) -> Self {
        let mut keys = HashMap::new();
        for entry in raw.split([';', ',']).map(str::trim).filter(|e| !e.is_empty()) {
            if let Some((kid, secret)) = entry.split_once('=') {
                let (kid, secret) = (kid.trim(), secret.trim());
                if !kid.is_empty() && !secret.is_empty() {
                    keys.insert(kid.to_string(), secret.to_string());
                }
            }
        }
        if !raw.is_empty() && !keys.contains_key(Self::DEFAULT_KID) {
            keys.insert(Self::DEFAULT_KID.to_string(), raw.to_string());
        }
        Self { keys }
    }

    pub fn get(&self, kid: &str) -> Option<&str> {
        self.keys.get(kid).map(String::as_str)
    }

    /// Secret for a token header's `kid`. Unknown ids fall back to `default`.
    pub fn resolve(&self, kid: Option<&str>) -> Option<&str> {
        match kid {
            Some(kid) => self.get(kid).or_else(|| {
                warn!(kid, "Unknown token key id, falling back to default");
                self.get(Self::DEFAULT_KID)
            }),
            None => self.get(Self::DEFAULT_KID),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kids: Vec<_> = self.keys.keys().collect();
        kids.sort();
        f.debug_struct("KeyRing").field("kids", &kids).finish()
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Session the token was issued for
    #[serde(alias = "sessionId")]
    pub sid: String,
    /// Unique token identifier, the unit of blacklisting
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl AccessClaims {
    pub fn user_id(&self) -> Option<UserId> {
        self.sub.parse().ok()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.sid.parse().ok()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Unsigned access token contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPayload {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<String>,
    pub session_id: SessionId,
    pub jti: String,
}

/// Signed access token
#[derive(Debug, Clone)]
pub struct SignedAccessToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

impl SignedAccessToken {
    /// Lifetime in whole seconds from `now`, never below zero
    pub fn expires_in(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

// ============================================================================
// Issuer
// ============================================================================

/// Builds, signs, and verifies access tokens
#[derive(Clone)]
pub struct TokenIssuer {
    keys: KeyRing,
    active_kid: String,
    encoding_key: EncodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl TokenIssuer {
    /// Create an issuer from configuration
    ///
    /// # Errors
    /// Returns a configuration error if the active key id has no secret
    pub fn new(
        config: &JwtConfig,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, AppError> {
        let keys = KeyRing::parse(&config.secret);
        let secret = keys.get(&config.active_kid).ok_or_else(|| {
            AppError::Config(format!("no JWT secret for key id '{}'", config.active_kid))
        })?;
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());

        Ok(Self {
            encoding_key,
            keys,
            active_kid: config.active_kid.clone(),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl: Duration::seconds(config.access_token_ttl_secs),
            clock,
            random,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Assemble an unsigned payload with a fresh token identifier
    pub fn build_payload(
        &self,
        user_id: UserId,
        username: impl Into<String>,
        roles: Vec<String>,
        session_id: SessionId,
    ) -> AccessPayload {
        AccessPayload {
            user_id,
            username: username.into(),
            roles,
            session_id,
            jti: random_hex(self.random.as_ref(), JTI_BYTES),
        }
    }

    /// Sign a payload with the active key
    ///
    /// # Errors
    /// Returns an error if token encoding fails
    pub fn sign(&self, payload: AccessPayload) -> Result<SignedAccessToken, AppError> {
        let now = self.clock.now();
        let expires_at = now + self.access_ttl;

        let claims = AccessClaims {
            sub: payload.user_id.to_string(),
            username: payload.username,
            roles: payload.roles,
            sid: payload.session_id.to_string(),
            jti: payload.jti,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.active_kid.clone());

        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode JWT: {e}")))?;

        Ok(SignedAccessToken {
            token,
            jti: claims.jti,
            expires_at,
        })
    }

    /// Check signature, issuer, audience, and expiry. Every failure is `None`.
    pub fn verify(&self, token: &str) -> Option<AccessClaims> {
        let header = decode_header(token).ok()?;
        if header.alg != Algorithm::HS256 {
            return None;
        }
        let secret = self.keys.resolve(header.kid.as_deref())?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        // expiry is checked against the injected clock below
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        let claims = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .ok()?
        .claims;

        if claims.exp <= self.clock.now().timestamp() {
            return None;
        }
        Some(claims)
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("keys", &self.keys)
            .field("active_kid", &self.active_kid)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .finish_non_exhaustive()
    }
}
