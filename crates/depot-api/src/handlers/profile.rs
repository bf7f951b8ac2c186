//! Profile handlers
//!
//! The caller's sessions, activity log, and password.

use axum::{
    extract::{Query, State},
    Json,
};
use depot_core::RevocationReason;
use depot_service::dto::{
    ActivityResponse, BulkRevokeQuery, ChangePasswordRequest, MessageResponse,
    RevokeAllResponse, SessionResponse,
};
use depot_service::{AccountService, ActivityService, SessionService};

use crate::extractors::{AuthUser, SessionIdPath, ValidatedJson};
use crate::response::ApiResult;
use crate::state::AppState;

/// List the caller's sessions, newest first
///
/// GET /profile/me/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> ApiResult<Json<Vec<SessionResponse>>> {
    let sessions = SessionService::new(state.service_context())
        .list_devices(principal.user_id, Some(principal.session_id))
        .await?;
    Ok(Json(sessions))
}

/// Revoke one of the caller's sessions
///
/// DELETE /profile/me/sessions/:id
pub async fn revoke_session(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    SessionIdPath(session_id): SessionIdPath,
) -> ApiResult<Json<MessageResponse>> {
    SessionService::new(state.service_context())
        .revoke(principal.user_id, session_id, RevocationReason::UserRevoked)
        .await?;
    Ok(Json(MessageResponse::new("Session revoked")))
}

/// Revoke every session of the caller, optionally keeping the current one
///
/// DELETE /profile/me/sessions?keepCurrent=true
pub async fn revoke_all_sessions(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<BulkRevokeQuery>,
) -> ApiResult<Json<RevokeAllResponse>> {
    let exclude = query.keep_current.then_some(principal.session_id);
    let revoked = SessionService::new(state.service_context())
        .revoke_all(principal.user_id, exclude, None)
        .await?;
    Ok(Json(RevokeAllResponse { revoked }))
}

/// Recent account activity
///
/// GET /profile/me/activity
pub async fn activity(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> ApiResult<Json<Vec<ActivityResponse>>> {
    let entries = ActivityService::new(state.service_context())
        .list(principal.user_id)
        .await?;
    Ok(Json(entries))
}

/// Set a new password; every other session is revoked
///
/// PUT /profile/me/password
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    AccountService::new(state.service_context())
        .change_password(principal.user_id, principal.session_id, request)
        .await?;
    Ok(Json(MessageResponse::new("Password updated")))
}
