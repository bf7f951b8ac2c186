//! Service context - dependency container for services
//!
//! Holds all repositories, cache-backed ports, crypto primitives, and the
//! realtime event sink needed by services.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use depot_common::auth::{random_hex, Argon2Hasher, OsRandom, TokenIssuer};
use depot_common::{AppConfig, AttemptLimitConfig};
use depot_core::traits::{
    ActivityRepository, AttemptDecision, AttemptLimiter, Clock, NoopEventSink, OtpVerifier,
    RandomSource, SecretHasher, SessionEventSink, SessionRepository, SystemClock,
    TokenBlacklist, UserRepository,
};
use tracing::warn;

use super::error::{ServiceError, ServiceResult};

/// Tunables for the session and login use cases
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub refresh_ttl: Duration,
    /// How many recent refresh tokens a presented secret is checked against
    pub reuse_lookback: u32,
    pub session_list_limit: u32,
    pub activity_list_limit: u32,
    pub login_limit: AttemptLimitConfig,
    pub password_change_limit: AttemptLimitConfig,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            refresh_ttl: Duration::days(config.session.refresh_ttl_days),
            reuse_lookback: config.session.reuse_lookback,
            session_list_limit: config.session.list_limit,
            activity_list_limit: 20,
            login_limit: config.login_limit,
            password_change_limit: config.password_change_limit,
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            refresh_ttl: Duration::days(7),
            reuse_lookback: 10,
            session_list_limit: 50,
            activity_list_limit: 20,
            login_limit: AttemptLimitConfig::default(),
            password_change_limit: AttemptLimitConfig::default(),
        }
    }
}

/// Service context containing all dependencies
///
/// This is the main dependency container that gets passed to all services.
/// It provides access to:
/// - Credential store repositories
/// - Blacklist and attempt limiter
/// - Token issuer, OTP verifier, and secret hasher
/// - Clock and random source
/// - The sink that pushes revocations to live connections
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    activity_repo: Arc<dyn ActivityRepository>,

    // Short-lived state
    blacklist: Arc<dyn TokenBlacklist>,
    limiter: Arc<dyn AttemptLimiter>,

    // Crypto
    token_issuer: Arc<TokenIssuer>,
    otp: Arc<dyn OtpVerifier>,
    hasher: Arc<dyn SecretHasher>,

    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    events: Arc<dyn SessionEventSink>,

    settings: ServiceSettings,
}

impl ServiceContext {
    // === Repositories ===

    /// Get the user repository
    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    /// Get the session repository
    pub fn session_repo(&self) -> &dyn SessionRepository {
        self.session_repo.as_ref()
    }

    /// Get the activity repository
    pub fn activity_repo(&self) -> &dyn ActivityRepository {
        self.activity_repo.as_ref()
    }

    // === Short-lived State ===

    pub fn blacklist(&self) -> &dyn TokenBlacklist {
        self.blacklist.as_ref()
    }

    pub fn limiter(&self) -> &dyn AttemptLimiter {
        self.limiter.as_ref()
    }

    // === Crypto ===

    /// Get the access token issuer
    pub fn token_issuer(&self) -> &TokenIssuer {
        self.token_issuer.as_ref()
    }

    pub fn otp(&self) -> &dyn OtpVerifier {
        self.otp.as_ref()
    }

    // === Time, Randomness, Events ===

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Hex encoding of `len` fresh random bytes
    pub fn random_hex(&self, len: usize) -> String {
        random_hex(self.random.as_ref(), len)
    }

    pub fn random(&self) -> &dyn RandomSource {
        self.random.as_ref()
    }

    pub fn events(&self) -> &dyn SessionEventSink {
        self.events.as_ref()
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    // === Attempt Limits ===

    /// Count an attempt under `key`. Fails with `RateLimited` once the window
    /// is exhausted; an unavailable limiter lets the attempt through.
    pub async fn check_attempts(&self, key: &str, limit: &AttemptLimitConfig) -> ServiceResult<()> {
        match self
            .limiter
            .check_and_increment(key, limit.max_attempts, limit.window_secs)
            .await
        {
            Ok(AttemptDecision::Allowed { .. }) => Ok(()),
            Ok(AttemptDecision::Blocked { retry_after_secs }) => {
                warn!(key, retry_after_secs, "Too many attempts");
                Err(ServiceError::rate_limited(retry_after_secs))
            }
            Err(e) => {
                warn!(key, error = %e, "Attempt limiter unavailable");
                Ok(())
            }
        }
    }

    /// Clear the counter under `key`, logging failures
    pub async fn reset_attempts(&self, key: &str) {
        if let Err(e) = self.limiter.reset(key).await {
            warn!(key, error = %e, "Failed to reset attempt counter");
        }
    }

    // === Blocking Work ===

    /// Hash a secret on the blocking pool
    pub async fn hash_secret(&self, secret: String) -> ServiceResult<String> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| ServiceError::internal(format!("hashing task failed: {e}")))?
            .map_err(ServiceError::from)
    }

    /// Verify a secret against one hash on the blocking pool
    pub async fn verify_secret(&self, secret: String, hash: String) -> ServiceResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &hash))
            .await
            .map_err(|e| ServiceError::internal(format!("hashing task failed: {e}")))
    }

    /// Index of the first hash the secret verifies against, checked in order
    pub async fn find_matching_hash(
        &self,
        secret: String,
        hashes: Vec<String>,
    ) -> ServiceResult<Option<usize>> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || {
            hashes.iter().position(|hash| hasher.verify(&secret, hash))
        })
        .await
        .map_err(|e| ServiceError::internal(format!("hashing task failed: {e}")))
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("token_issuer", &self.token_issuer)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Builder for creating ServiceContext with custom configuration
///
/// Clock, random source, hasher, event sink, and settings have defaults;
/// everything else is required.
pub struct ServiceContextBuilder {
    user_repo: Option<Arc<dyn UserRepository>>,
    session_repo: Option<Arc<dyn SessionRepository>>,
    activity_repo: Option<Arc<dyn ActivityRepository>>,
    blacklist: Option<Arc<dyn TokenBlacklist>>,
    limiter: Option<Arc<dyn AttemptLimiter>>,
    token_issuer: Option<Arc<TokenIssuer>>,
    otp: Option<Arc<dyn OtpVerifier>>,
    hasher: Option<Arc<dyn SecretHasher>>,
    clock: Option<Arc<dyn Clock>>,
    random: Option<Arc<dyn RandomSource>>,
    events: Option<Arc<dyn SessionEventSink>>,
    settings: Option<ServiceSettings>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self {
            user_repo: None,
            session_repo: None,
            activity_repo: None,
            blacklist: None,
            limiter: None,
            token_issuer: None,
            otp: None,
            hasher: None,
            clock: None,
            random: None,
            events: None,
            settings: None,
        }
    }

    pub fn user_repo(mut self, repo: Arc<dyn UserRepository>) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn session_repo(mut self, repo: Arc<dyn SessionRepository>) -> Self {
        self.session_repo = Some(repo);
        self
    }

    pub fn activity_repo(mut self, repo: Arc<dyn ActivityRepository>) -> Self {
        self.activity_repo = Some(repo);
        self
    }

    pub fn blacklist(mut self, blacklist: Arc<dyn TokenBlacklist>) -> Self {
        self.blacklist = Some(blacklist);
        self
    }

    pub fn limiter(mut self, limiter: Arc<dyn AttemptLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn token_issuer(mut self, issuer: Arc<TokenIssuer>) -> Self {
        self.token_issuer = Some(issuer);
        self
    }

    pub fn otp(mut self, otp: Arc<dyn OtpVerifier>) -> Self {
        self.otp = Some(otp);
        self
    }

    pub fn hasher(mut self, hasher: Arc<dyn SecretHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    pub fn events(mut self, events: Arc<dyn SessionEventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn settings(mut self, settings: ServiceSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext {
            user_repo: self
                .user_repo
                .ok_or_else(|| ServiceError::validation("user_repo is required"))?,
            session_repo: self
                .session_repo
                .ok_or_else(|| ServiceError::validation("session_repo is required"))?,
            activity_repo: self
                .activity_repo
                .ok_or_else(|| ServiceError::validation("activity_repo is required"))?,
            blacklist: self
                .blacklist
                .ok_or_else(|| ServiceError::validation("blacklist is required"))?,
            limiter: self
                .limiter
                .ok_or_else(|| ServiceError::validation("limiter is required"))?,
            token_issuer: self
                .token_issuer
                .ok_or_else(|| ServiceError::validation("token_issuer is required"))?,
            otp: self
                .otp
                .ok_or_else(|| ServiceError::validation("otp is required"))?,
            hasher: self.hasher.unwrap_or_else(|| Arc::new(Argon2Hasher::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            random: self.random.unwrap_or_else(|| Arc::new(OsRandom)),
            events: self.events.unwrap_or_else(|| Arc::new(NoopEventSink)),
            settings: self.settings.unwrap_or_default(),
        })
    }
}

impl Default for ServiceContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
