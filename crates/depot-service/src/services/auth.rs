//! Authentication service
//!
//! Handles registration, OTP and recovery-code login, refresh token exchange,
//! logout, and authentication of bearer access tokens.

use chrono::{DateTime, Utc};
use depot_common::auth::{generate_recovery_code, SignedAccessToken};
use depot_core::entities::{ActivityAction, ClientInfo, User, DEFAULT_ROLE};
use depot_core::{DomainError, RefreshArtifact, RevocationReason, SessionId, UserId};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::dto::{
    AuthResponse, LoginRequest, ProfileResponse, RecoveryLoginRequest, RegisterRequest,
    RegisterResponse, UserSummary,
};

use super::activity::ActivityService;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::session::SessionService;

/// Attempt counter key for callers without a known address
const UNKNOWN_IP: &str = "unknown";

/// Blacklist reason recorded on logout
const LOGOUT_REASON: &str = "logout";

/// Result of a successful login or refresh
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub access: SignedAccessToken,
    pub session_id: SessionId,
    pub refresh_artifact: RefreshArtifact,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: UserSummary,
    /// Set only by recovery-code login
    pub new_recovery_code: Option<String>,
}

impl AuthOutcome {
    /// JSON body for the caller; the refresh artifact is left out
    pub fn to_response(&self, now: DateTime<Utc>) -> AuthResponse {
        AuthResponse {
            access_token: self.access.token.clone(),
            token_type: "Bearer".to_string(),
            expires_in: self.access.expires_in(now),
            session_id: self.session_id,
            refresh_expires_at: self.refresh_expires_at,
            user: self.user.clone(),
            new_recovery_code: self.new_recovery_code.clone(),
        }
    }
}

/// An authenticated caller, resolved from a bearer access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<String>,
    pub session_id: SessionId,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    pub fn to_profile(&self) -> ProfileResponse {
        ProfileResponse {
            user_id: self.user_id,
            username: self.username.clone(),
            roles: self.roles.clone(),
            session_id: self.session_id,
        }
    }
}

/// Authentication service
pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Register a new account with an OTP secret and a recovery code
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<RegisterResponse> {
        if self.ctx.user_repo().username_exists(&request.username).await? {
            return Err(DomainError::UsernameTaken.into());
        }

        let secret = self.ctx.otp().generate_secret();
        let recovery_code = generate_recovery_code(self.ctx.random());
        let user = User::new(
            request.username,
            secret.clone(),
            recovery_code.clone(),
            self.ctx.now(),
        );

        self.ctx.user_repo().create(&user).await?;
        self.ctx.user_repo().assign_role(user.id, DEFAULT_ROLE).await?;

        let provisioning = self.ctx.otp().provisioning(&secret, &user.username)?;

        info!(user_id = %user.id, "User registered successfully");

        Ok(RegisterResponse {
            user_id: user.id,
            username: user.username,
            otpauth_url: provisioning.otpauth_url,
            qr_code: provisioning.qr_code,
            recovery_code,
            secret,
        })
    }

    /// Login with username and OTP code
    #[instrument(skip(self, request, client), fields(username = %request.username))]
    pub async fn login(
        &self,
        request: LoginRequest,
        client: &ClientInfo,
    ) -> ServiceResult<AuthOutcome> {
        let ip = client.ip.as_deref().unwrap_or(UNKNOWN_IP);
        self.ctx
            .check_attempts(ip, &self.ctx.settings().login_limit)
            .await?;

        let user = self.find_user(&request.username).await?;

        let verified = user
            .otp_secret
            .as_deref()
            .is_some_and(|secret| self.ctx.otp().verify(secret, &request.token, self.ctx.now()));
        if !verified {
            warn!(user_id = %user.id, "Login failed: invalid OTP");
            self.login_failed(user.id, "invalid_otp", client).await;
            return Err(ServiceError::invalid_otp());
        }

        if !user.otp_enabled {
            self.ctx.user_repo().set_otp_enabled(user.id, true).await?;
            info!(user_id = %user.id, "OTP enabled on first successful login");
        }

        self.ctx.reset_attempts(ip).await;
        self.open_session(&user, client).await
    }

    /// Login with username and the one-time recovery code, which is replaced
    #[instrument(skip(self, request, client), fields(username = %request.username))]
    pub async fn login_with_recovery_code(
        &self,
        request: RecoveryLoginRequest,
        client: &ClientInfo,
    ) -> ServiceResult<AuthOutcome> {
        let ip = client.ip.as_deref().unwrap_or(UNKNOWN_IP);
        self.ctx
            .check_attempts(ip, &self.ctx.settings().login_limit)
            .await?;

        let user = self.find_user(&request.username).await?;

        if !user.recovery_code_matches(&request.recovery_code) {
            warn!(user_id = %user.id, "Login failed: invalid recovery code");
            self.login_failed(user.id, "invalid_recovery_code", client).await;
            return Err(ServiceError::invalid_credential());
        }

        let new_code = generate_recovery_code(self.ctx.random());
        let swapped = self
            .ctx
            .user_repo()
            .replace_recovery_code(user.id, &request.recovery_code, &new_code)
            .await?;
        if !swapped {
            // spent by a concurrent login
            warn!(user_id = %user.id, "Login failed: recovery code already used");
            return Err(ServiceError::invalid_credential());
        }

        self.ctx.reset_attempts(ip).await;

        let mut outcome = self.open_session(&user, client).await?;
        outcome.new_recovery_code = Some(new_code);
        Ok(outcome)
    }

    /// Exchange a refresh artifact for a new access token and artifact
    #[instrument(skip(self, presented, client), fields(ip = ?client.ip))]
    pub async fn refresh(
        &self,
        presented: Option<&str>,
        client: &ClientInfo,
    ) -> ServiceResult<AuthOutcome> {
        let raw = presented
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(ServiceError::invalid_token)?;
        let session_id = RefreshArtifact::parse(raw)
            .and_then(|artifact| artifact.session_id())
            .ok_or_else(ServiceError::invalid_token)?;

        let sessions = SessionService::new(self.ctx);
        let session = sessions.find(session_id).await?;
        let rotated = sessions.rotate(session.user_id, session.id, raw).await?;

        let user = self
            .ctx
            .user_repo()
            .find_by_id(session.user_id)
            .await?
            .ok_or_else(ServiceError::invalid_token)?;
        let roles = self.ctx.user_repo().roles_for(user.id).await?;

        let payload =
            self.ctx
                .token_issuer()
                .build_payload(user.id, user.username.clone(), roles.clone(), session.id);
        let access = self.ctx.token_issuer().sign(payload)?;

        debug!(user_id = %user.id, session_id = %session.id, "Tokens refreshed");

        Ok(AuthOutcome {
            access,
            session_id: session.id,
            refresh_artifact: rotated.refresh_artifact,
            refresh_expires_at: rotated.expires_at,
            user: UserSummary {
                id: user.id,
                username: user.username,
                roles,
            },
            new_recovery_code: None,
        })
    }

    /// Blacklist the caller's access token and revoke its session
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id, session_id = %principal.session_id))]
    pub async fn logout(&self, principal: &Principal) -> ServiceResult<()> {
        let remaining = (principal.expires_at - self.ctx.now()).num_seconds().max(1);
        let ttl_secs = u64::try_from(remaining).unwrap_or(1);
        if let Err(e) = self
            .ctx
            .blacklist()
            .add(&principal.jti, ttl_secs, LOGOUT_REASON)
            .await
        {
            warn!(error = %e, "Failed to blacklist access token on logout");
        }

        SessionService::new(self.ctx)
            .revoke(principal.user_id, principal.session_id, RevocationReason::Logout)
            .await?;

        info!("User logged out");
        Ok(())
    }

    /// Resolve a bearer access token to the caller, with current roles
    pub async fn authenticate(&self, token: &str) -> ServiceResult<Principal> {
        let claims = self
            .ctx
            .token_issuer()
            .verify(token)
            .ok_or_else(ServiceError::invalid_token)?;
        let (Some(user_id), Some(session_id), Some(expires_at)) =
            (claims.user_id(), claims.session_id(), claims.expires_at())
        else {
            return Err(ServiceError::invalid_token());
        };

        match self.ctx.blacklist().is_blacklisted(&claims.jti).await {
            Ok(true) => {
                debug!(user_id = %user_id, "Token revoked");
                return Err(ServiceError::invalid_token());
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Blacklist unavailable, accepting token"),
        }

        let user = self
            .ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(ServiceError::invalid_token)?;
        let roles = self.ctx.user_repo().roles_for(user_id).await?;

        Ok(Principal {
            user_id,
            username: user.username,
            roles,
            session_id,
            jti: claims.jti,
            expires_at,
        })
    }

    // === Helpers ===

    async fn find_user(&self, username: &str) -> ServiceResult<User> {
        self.ctx
            .user_repo()
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(username.to_string()).into())
    }

    async fn login_failed(&self, user_id: UserId, reason: &str, client: &ClientInfo) {
        ActivityService::new(self.ctx)
            .log(
                user_id,
                ActivityAction::LoginFailure,
                Some(json!({ "reason": reason, "ip": client.ip })),
            )
            .await;
    }

    async fn open_session(&self, user: &User, client: &ClientInfo) -> ServiceResult<AuthOutcome> {
        let created = SessionService::new(self.ctx)
            .create_session(user.id, client)
            .await?;
        let roles = self.ctx.user_repo().roles_for(user.id).await?;

        let payload = self.ctx.token_issuer().build_payload(
            user.id,
            user.username.clone(),
            roles.clone(),
            created.session_id,
        );
        let access = self.ctx.token_issuer().sign(payload)?;

        ActivityService::new(self.ctx)
            .log(
                user.id,
                ActivityAction::LoginSuccess,
                Some(json!({ "session_id": created.session_id, "ip": client.ip })),
            )
            .await;
        self.ctx.user_repo().record_login(user.id, self.ctx.now()).await?;

        info!(user_id = %user.id, session_id = %created.session_id, "User logged in successfully");

        Ok(AuthOutcome {
            access,
            session_id: created.session_id,
            refresh_artifact: created.refresh_artifact,
            refresh_expires_at: created.expires_at,
            user: UserSummary {
                id: user.id,
                username: user.username.clone(),
                roles,
            },
            new_recovery_code: None,
        })
    }
}
