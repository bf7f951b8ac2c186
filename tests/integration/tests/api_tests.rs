//! API Integration Tests
//!
//! Each test starts its own server over in-memory stores, so no external
//! services are needed.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use integration_tests::{
    assert_error, assert_json, assert_status, clears_refresh_cookie, fixtures::*,
    refresh_cookie, TestServer,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_health_ready_reports_realtime_counts() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health/ready").await.expect("Request failed");
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["realtime"]["sockets"], 0);
    assert_eq!(body["realtime"]["users"], 0);
}

// ============================================================================
// Registration and Login Tests
// ============================================================================

#[tokio::test]
async fn test_register_returns_otp_material() {
    let server = TestServer::start().await.expect("Failed to start server");
    let account = register(&server).await.unwrap();

    assert!(!account.secret.is_empty());
    assert!(!account.recovery_code.is_empty());
    assert!(!account.user_id.is_empty());
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let server = TestServer::start().await.expect("Failed to start server");
    let request = RegisterRequest::unique();

    let response = server.post("/api/v1/auth/register", &request).await.unwrap();
    assert_status(response, StatusCode::CREATED).await.unwrap();

    let response = server.post("/api/v1/auth/register", &request).await.unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "USERNAME_TAKEN");
}

#[tokio::test]
async fn test_register_short_username_rejected() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server
        .post("/api/v1/auth/register", &json!({ "username": "ab" }))
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_sets_refresh_cookie() {
    let server = TestServer::start().await.expect("Failed to start server");
    let account = register(&server).await.unwrap();

    let request = LoginRequest {
        username: account.username.clone(),
        token: account.current_code().unwrap(),
    };
    let response = server.post("/api/v1/auth/login", &request).await.unwrap();

    let set_cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("login should set a cookie");
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let auth: AuthResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(auth.token_type, "Bearer");
    assert!(auth.expires_in > 0);
    assert_eq!(auth.user.username, account.username);
    assert_eq!(auth.user.id, account.user_id);
}

#[tokio::test]
async fn test_login_wrong_code() {
    let server = TestServer::start().await.expect("Failed to start server");
    let account = register(&server).await.unwrap();

    let current = account.current_code().unwrap();
    let wrong = if current == "000000" { "111111" } else { "000000" };
    let request = LoginRequest {
        username: account.username.clone(),
        token: wrong.to_string(),
    };

    let response = server.post("/api/v1/auth/login", &request).await.unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_unknown_user() {
    let server = TestServer::start().await.expect("Failed to start server");
    let request = LoginRequest {
        username: "nobody-here".to_string(),
        token: "123456".to_string(),
    };
    let response = server.post("/api/v1/auth/login", &request).await.unwrap();
    let code = assert_error(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(code, "UNKNOWN_USER");
}

#[tokio::test]
async fn test_recovery_login_rotates_code() {
    let server = TestServer::start().await.expect("Failed to start server");
    let account = register(&server).await.unwrap();
    let body = json!({
        "username": account.username,
        "recoveryCode": account.recovery_code,
    });

    let response = server.post("/api/v1/auth/login-recovery", &body).await.unwrap();
    let auth: AuthResponse = assert_json(response, StatusCode::OK).await.unwrap();
    let replacement = auth.new_recovery_code.expect("a new recovery code is issued");
    assert_ne!(replacement, account.recovery_code);

    // the spent code is gone
    let response = server.post("/api/v1/auth/login-recovery", &body).await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_profile_requires_bearer() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/api/v1/auth/profile").await.unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "MISSING_AUTHORIZATION");

    let response = server.get_auth("/api/v1/auth/profile", "garbage").await.unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_TOKEN");
}

#[tokio::test]
async fn test_profile_names_current_session() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (account, session) = register_and_login(&server).await.unwrap();

    let response = server
        .get_auth("/api/v1/auth/profile", &session.access_token)
        .await
        .unwrap();
    let profile: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(profile["username"], account.username.as_str());
    assert_eq!(profile["session_id"], session.session_id.as_str());
}

// ============================================================================
// Refresh Rotation Tests
// ============================================================================

#[tokio::test]
async fn test_refresh_rotates_cookie() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_, session) = register_and_login(&server).await.unwrap();

    let response = server
        .post_with_cookie("/api/v1/auth/refresh", &session.refresh_token)
        .await
        .unwrap();
    let rotated = refresh_cookie(&response).expect("refresh should set a cookie");
    let auth: AuthResponse = assert_json(response, StatusCode::OK).await.unwrap();

    assert_ne!(rotated, session.refresh_token);
    assert_eq!(auth.session_id, session.session_id);

    let response = server
        .get_auth("/api/v1/auth/profile", &auth.access_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server
        .post("/api/v1/auth/refresh", &json!({}))
        .await
        .unwrap();
    assert!(clears_refresh_cookie(&response));
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_TOKEN");
}

#[tokio::test]
async fn test_refresh_reuse_revokes_session() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_, session) = register_and_login(&server).await.unwrap();

    let response = server
        .post_with_cookie("/api/v1/auth/refresh", &session.refresh_token)
        .await
        .unwrap();
    let rotated = refresh_cookie(&response).expect("refresh should set a cookie");
    assert_status(response, StatusCode::OK).await.unwrap();

    // replaying the superseded token is treated as theft
    let response = server
        .post_with_cookie("/api/v1/auth/refresh", &session.refresh_token)
        .await
        .unwrap();
    assert!(clears_refresh_cookie(&response));
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();

    // and the legitimate successor dies with the session
    let response = server
        .post_with_cookie("/api/v1/auth/refresh", &rotated)
        .await
        .unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_refresh_garbage_cookie() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server
        .post_with_cookie("/api/v1/auth/refresh", "not-an-artifact")
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_TOKEN");
}

// ============================================================================
// Logout Tests
// ============================================================================

#[tokio::test]
async fn test_logout_rejects_access_token_and_refresh() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_, session) = register_and_login(&server).await.unwrap();

    let response = server
        .post_auth("/api/v1/auth/logout", &session.access_token)
        .await
        .unwrap();
    assert!(clears_refresh_cookie(&response));
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server
        .get_auth("/api/v1/auth/profile", &session.access_token)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_TOKEN");

    let response = server
        .post_with_cookie("/api/v1/auth/refresh", &session.refresh_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_logout_without_auth_still_clears_cookie() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server
        .post("/api/v1/auth/logout", &json!({}))
        .await
        .unwrap();
    assert!(clears_refresh_cookie(&response));
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

// ============================================================================
// Session Management Tests
// ============================================================================

#[tokio::test]
async fn test_list_and_revoke_sessions() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (account, first) = register_and_login(&server).await.unwrap();
    let second = login(&server, &account).await.unwrap();

    let response = server
        .get_auth("/api/v1/profile/me/sessions", &first.access_token)
        .await
        .unwrap();
    let sessions: Vec<SessionResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(sessions.len(), 2);
    let current: Vec<_> = sessions.iter().filter(|s| s.is_current).collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].id, first.session_id);
    assert!(sessions.iter().all(|s| s.status == "active"));

    let path = format!("/api/v1/profile/me/sessions/{}", second.session_id);
    let response = server.delete_auth(&path, &first.access_token).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    // the revoked device can no longer refresh
    let response = server
        .post_with_cookie("/api/v1/auth/refresh", &second.refresh_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_revoke_session_bad_ids() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_, session) = register_and_login(&server).await.unwrap();

    let response = server
        .delete_auth("/api/v1/profile/me/sessions/not-a-uuid", &session.access_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();

    let response = server
        .delete_auth(
            "/api/v1/profile/me/sessions/00000000-0000-4000-8000-000000000000",
            &session.access_token,
        )
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(code, "UNKNOWN_SESSION");
}

#[tokio::test]
async fn test_cannot_revoke_another_users_session() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_, alice) = register_and_login(&server).await.unwrap();
    let (_, bob) = register_and_login(&server).await.unwrap();

    let path = format!("/api/v1/profile/me/sessions/{}", bob.session_id);
    let response = server.delete_auth(&path, &alice.access_token).await.unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();

    let response = server
        .post_with_cookie("/api/v1/auth/refresh", &bob.refresh_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_revoke_all_keeping_current() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (account, keep) = register_and_login(&server).await.unwrap();
    let other = login(&server, &account).await.unwrap();
    let third = login(&server, &account).await.unwrap();

    let response = server
        .delete_auth("/api/v1/profile/me/sessions?keepCurrent=true", &keep.access_token)
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["revoked"], 2);

    for gone in [&other, &third] {
        let response = server
            .post_with_cookie("/api/v1/auth/refresh", &gone.refresh_token)
            .await
            .unwrap();
        assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
    }

    let response = server
        .post_with_cookie("/api/v1/auth/refresh", &keep.refresh_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

// ============================================================================
// Activity and Password Tests
// ============================================================================

#[tokio::test]
async fn test_activity_records_login() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_, session) = register_and_login(&server).await.unwrap();

    let response = server
        .get_auth("/api/v1/profile/me/activity", &session.access_token)
        .await
        .unwrap();
    let entries: Vec<Value> = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(entries.iter().any(|e| e["action"] == "LOGIN_SUCCESS"));
}

#[tokio::test]
async fn test_first_password_revokes_other_sessions() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (account, current) = register_and_login(&server).await.unwrap();
    let other = login(&server, &account).await.unwrap();

    let response = server
        .put_auth(
            "/api/v1/profile/me/password",
            &current.access_token,
            &json!({ "newPassword": "correct-horse-Battery-9" }),
        )
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server
        .post_with_cookie("/api/v1/auth/refresh", &other.refresh_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();

    let response = server
        .post_with_cookie("/api/v1/auth/refresh", &current.refresh_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    // a password now exists, so the current one is required
    let response = server
        .put_auth(
            "/api/v1/profile/me/password",
            &current.access_token,
            &json!({ "newPassword": "another-Strong-pass-7" }),
        )
        .await
        .unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();
}

// ============================================================================
// MFA Tests
// ============================================================================

#[tokio::test]
async fn test_mfa_enabled_after_login() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_, session) = register_and_login(&server).await.unwrap();

    // the first OTP login switched MFA on
    let response = server
        .post_auth("/api/v1/profile/mfa/enable", &session.access_token)
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(code, "MFA_ALREADY_ENABLED");
}
