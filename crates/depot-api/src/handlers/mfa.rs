//! MFA handlers

use axum::{extract::State, Json};
use depot_service::dto::{MfaSetupResponse, MfaStatusResponse, OtpCodeRequest};
use depot_service::MfaService;

use crate::extractors::{AuthUser, ValidatedJson};
use crate::response::ApiResult;
use crate::state::AppState;

/// POST /profile/mfa/enable
pub async fn enable(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> ApiResult<Json<MfaSetupResponse>> {
    let setup = MfaService::new(state.service_context())
        .enable(principal.user_id)
        .await?;
    Ok(Json(setup))
}

/// POST /profile/mfa/verify
pub async fn verify(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidatedJson(request): ValidatedJson<OtpCodeRequest>,
) -> ApiResult<Json<MfaStatusResponse>> {
    let status = MfaService::new(state.service_context())
        .verify(principal.user_id, &request.token)
        .await?;
    Ok(Json(status))
}

/// POST /profile/mfa/disable
pub async fn disable(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidatedJson(request): ValidatedJson<OtpCodeRequest>,
) -> ApiResult<Json<MfaStatusResponse>> {
    let status = MfaService::new(state.service_context())
        .disable(principal.user_id, &request.token)
        .await?;
    Ok(Json(status))
}
