//! User entity <-> model mapper

use depot_core::entities::User;
use depot_core::value_objects::UserId;

use crate::models::UserModel;

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        User {
            id: UserId::from_uuid(model.id),
            username: model.username,
            password_hash: model.password_hash,
            otp_secret: model.otp_secret,
            otp_enabled: model.otp_enabled,
            recovery_code: model.recovery_code,
            created_at: model.created_at,
            updated_at: model.updated_at,
            last_login_at: model.last_login_at,
            last_password_change_at: model.last_password_change_at,
        }
    }
}
