//! Account service
//!
//! Password changes. A new password ends every other session of the user.

use depot_common::auth::validate_password_strength;
use depot_core::entities::ActivityAction;
use depot_core::{DomainError, RevocationReason, SessionId, UserId};
use tracing::{info, instrument, warn};

use crate::dto::ChangePasswordRequest;

use super::activity::ActivityService;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::session::SessionService;

/// Account service
pub struct AccountService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AccountService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Set a new password, checking the current one if any. Returns how many
    /// other sessions were revoked.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_session: SessionId,
        request: ChangePasswordRequest,
    ) -> ServiceResult<usize> {
        let key = format!("pwd_change:{user_id}");
        self.ctx
            .check_attempts(&key, &self.ctx.settings().password_change_limit)
            .await?;

        validate_password_strength(&request.new_password)?;

        let user = self
            .ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id))?;

        if let Some(hash) = user.password_hash {
            let current = request
                .current_password
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ServiceError::validation("current_password is required"))?;
            if !self.ctx.verify_secret(current, hash).await? {
                warn!("Password change refused: current password mismatch");
                return Err(ServiceError::invalid_credential());
            }
        }

        let new_hash = self.ctx.hash_secret(request.new_password).await?;
        let now = self.ctx.now();
        self.ctx
            .user_repo()
            .update_password(user_id, &new_hash, now)
            .await?;

        ActivityService::new(self.ctx)
            .log(user_id, ActivityAction::PasswordChange, None)
            .await;

        let revoked = SessionService::new(self.ctx)
            .revoke_all(
                user_id,
                Some(current_session),
                Some(RevocationReason::PasswordChange),
            )
            .await?;

        info!(revoked, "Password changed");
        Ok(revoked)
    }
}
