//! Authentication handlers
//!
//! Registration, login, refresh rotation, and logout. The refresh artifact
//! is set and cleared through the refresh cookie only.

use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use depot_service::dto::{
    LoginRequest, MessageResponse, ProfileResponse, RecoveryLoginRequest, RegisterRequest,
    RegisterResponse,
};
use depot_service::{AuthOutcome, AuthService};

use crate::extractors::{AuthUser, Client, ValidatedJson};
use crate::response::{ApiError, ApiResult, Created};
use crate::state::AppState;

/// Register a new account
///
/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<Created<Json<RegisterResponse>>> {
    let response = AuthService::new(state.service_context())
        .register(request)
        .await?;
    Ok(Created(Json(response)))
}

/// Login with username and OTP code
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Client(client): Client,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Response> {
    let outcome = AuthService::new(state.service_context())
        .login(request, &client)
        .await?;
    with_refresh_cookie(&state, &outcome)
}

/// Login with the one-time recovery code
///
/// POST /auth/login-recovery
pub async fn login_recovery(
    State(state): State<AppState>,
    Client(client): Client,
    ValidatedJson(request): ValidatedJson<RecoveryLoginRequest>,
) -> ApiResult<Response> {
    let outcome = AuthService::new(state.service_context())
        .login_with_recovery_code(request, &client)
        .await?;
    with_refresh_cookie(&state, &outcome)
}

/// Rotate the refresh cookie and mint a new access token
///
/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Client(client): Client,
    jar: CookieJar,
) -> Response {
    let presented = jar
        .get(state.refresh_cookie().name())
        .map(|cookie| cookie.value().to_string());

    let result = AuthService::new(state.service_context())
        .refresh(presented.as_deref(), &client)
        .await;

    match result {
        Ok(outcome) => with_refresh_cookie(&state, &outcome).into_response(),
        Err(e) => {
            let error = ApiError::from(e);
            // a dead artifact is useless to the browser
            let clear = error.status_code().is_client_error();
            let mut response = error.into_response();
            if clear {
                if let Ok(value) = state.refresh_cookie().clear() {
                    response.headers_mut().append(SET_COOKIE, value);
                }
            }
            response
        }
    }
}

/// Revoke the caller's session and blacklist the access token. The refresh
/// cookie is cleared whatever happens.
///
/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    auth: Result<AuthUser, ApiError>,
) -> Response {
    let result = match auth {
        Ok(AuthUser(principal)) => AuthService::new(state.service_context())
            .logout(&principal)
            .await
            .map_err(ApiError::from),
        Err(e) => Err(e),
    };

    let mut response = match result {
        Ok(()) => Json(MessageResponse::new("Logged out")).into_response(),
        Err(e) => e.into_response(),
    };
    if let Ok(value) = state.refresh_cookie().clear() {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

/// Current caller
///
/// GET /auth/profile
pub async fn profile(AuthUser(principal): AuthUser) -> Json<ProfileResponse> {
    Json(principal.to_profile())
}

fn with_refresh_cookie(state: &AppState, outcome: &AuthOutcome) -> ApiResult<Response> {
    let now = state.service_context().now();
    let max_age = (outcome.refresh_expires_at - now).num_seconds();
    let cookie = state
        .refresh_cookie()
        .set(&outcome.refresh_artifact.to_string(), max_age)?;

    Ok(([(SET_COOKIE, cookie)], Json(outcome.to_response(now))).into_response())
}
