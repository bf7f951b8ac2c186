//! Route definitions
//!
//! API routes are mounted under /api/v1; health and the realtime endpoint
//! live at the root.

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{auth, health, mfa, profile};
use crate::state::AppState;

/// Create the main API router (health routes are mounted separately)
pub fn create_router() -> Router<AppState> {
    Router::new().nest("/api/v1", api_v1_routes())
}

/// Health check routes (exported separately to bypass rate limiting)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

/// API v1 routes
fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(profile_routes())
        .merge(mfa_routes())
}

/// Authentication routes
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/login-recovery", post(auth::login_recovery))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/profile", get(auth::profile))
}

/// Session, activity, and password routes for the caller
fn profile_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile/me/sessions",
            get(profile::list_sessions).delete(profile::revoke_all_sessions),
        )
        .route("/profile/me/sessions/:id", delete(profile::revoke_session))
        .route("/profile/me/activity", get(profile::activity))
        .route("/profile/me/password", put(profile::change_password))
}

/// MFA routes
fn mfa_routes() -> Router<AppState> {
    Router::new()
        .route("/profile/mfa/enable", post(mfa::enable))
        .route("/profile/mfa/verify", post(mfa::verify))
        .route("/profile/mfa/disable", post(mfa::disable))
}
