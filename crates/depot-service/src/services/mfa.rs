//! MFA management
//!
//! Enrollment, confirmation, and removal of the TOTP second factor.

use depot_core::entities::{ActivityAction, User};
use depot_core::{DomainError, UserId};
use tracing::{info, instrument, warn};

use crate::dto::{MfaSetupResponse, MfaStatusResponse};

use super::activity::ActivityService;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// MFA service
pub struct MfaService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MfaService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Start enrollment, provisioning a secret if the user has none
    #[instrument(skip(self))]
    pub async fn enable(&self, user_id: UserId) -> ServiceResult<MfaSetupResponse> {
        let user = self.user(user_id).await?;
        if user.otp_enabled {
            return Err(DomainError::MfaAlreadyEnabled.into());
        }

        let secret = match user.otp_secret {
            Some(secret) => secret,
            None => {
                let secret = self.ctx.otp().generate_secret();
                self.ctx.user_repo().set_otp_secret(user_id, &secret).await?;
                secret
            }
        };

        let provisioning = self.ctx.otp().provisioning(&secret, &user.username)?;
        Ok(MfaSetupResponse {
            otpauth_url: provisioning.otpauth_url,
            qr_code: provisioning.qr_code,
        })
    }

    /// Confirm enrollment with a code from the authenticator app
    #[instrument(skip(self, code))]
    pub async fn verify(&self, user_id: UserId, code: &str) -> ServiceResult<MfaStatusResponse> {
        let user = self.user(user_id).await?;
        let secret = user
            .otp_secret
            .as_deref()
            .ok_or_else(|| ServiceError::validation("MFA setup has not been started"))?;

        if !self.ctx.otp().verify(secret, code, self.ctx.now()) {
            warn!("MFA verification failed");
            return Err(ServiceError::invalid_otp());
        }

        if !user.otp_enabled {
            self.ctx.user_repo().set_otp_enabled(user_id, true).await?;
            ActivityService::new(self.ctx)
                .log(user_id, ActivityAction::MfaEnabled, None)
                .await;
            info!("MFA enabled");
        }

        Ok(MfaStatusResponse { enabled: true })
    }

    /// Turn MFA off, confirmed by a current code
    #[instrument(skip(self, code))]
    pub async fn disable(&self, user_id: UserId, code: &str) -> ServiceResult<MfaStatusResponse> {
        let user = self.user(user_id).await?;
        if !user.otp_enabled {
            return Ok(MfaStatusResponse { enabled: false });
        }

        let verified = user
            .otp_secret
            .as_deref()
            .is_some_and(|secret| self.ctx.otp().verify(secret, code, self.ctx.now()));
        if !verified {
            warn!("MFA disable refused: invalid code");
            return Err(ServiceError::invalid_otp());
        }

        self.ctx.user_repo().set_otp_enabled(user_id, false).await?;
        ActivityService::new(self.ctx)
            .log(user_id, ActivityAction::MfaDisabled, None)
            .await;
        info!("MFA disabled");

        Ok(MfaStatusResponse { enabled: false })
    }

    async fn user(&self, user_id: UserId) -> ServiceResult<User> {
        self.ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id).into())
    }
}
