//! Realtime gateway integration tests
//!
//! Run with: cargo test -p integration-tests --test realtime_tests

use integration_tests::{assert_json, assert_status, fixtures::*, test_config, TestServer};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_revoke_pushes_session_revoked() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (account, watched) = register_and_login(&server).await.unwrap();
    let admin = login(&server, &account).await.unwrap();

    let mut socket = server.connect_ws(&watched.access_token).await.unwrap();
    server.wait_for_sockets(1).await.unwrap();

    let path = format!("/api/v1/profile/me/sessions/{}", watched.session_id);
    let response = server.delete_auth(&path, &admin.access_token).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let event = socket.next_event().await.unwrap();
    assert_eq!(event["type"], "session_revoked");
    assert_eq!(event["sessionId"], watched.session_id.as_str());
    assert_eq!(event["reason"], "user_revoked");
}

#[tokio::test]
async fn test_revoke_leaves_other_sessions_quiet() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (account, revoked) = register_and_login(&server).await.unwrap();
    let survivor = login(&server, &account).await.unwrap();

    let mut quiet = server.connect_ws(&survivor.access_token).await.unwrap();
    let mut loud = server.connect_ws(&revoked.access_token).await.unwrap();
    server.wait_for_sockets(2).await.unwrap();

    let path = format!("/api/v1/profile/me/sessions/{}", revoked.session_id);
    let response = server.delete_auth(&path, &survivor.access_token).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let event = loud.next_event().await.unwrap();
    assert_eq!(event["sessionId"], revoked.session_id.as_str());

    // a logout on the survivor is the next thing its socket hears
    let response = server
        .post_auth("/api/v1/auth/logout", &survivor.access_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let event = quiet.next_event().await.unwrap();
    assert_eq!(event["sessionId"], survivor.session_id.as_str());
    assert_eq!(event["reason"], "logout");
}

#[tokio::test]
async fn test_bulk_revoke_reaches_every_other_socket() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (account, keep) = register_and_login(&server).await.unwrap();
    let other = login(&server, &account).await.unwrap();

    let kept_socket = server.connect_ws(&keep.access_token).await.unwrap();
    let mut other_socket = server.connect_ws(&other.access_token).await.unwrap();
    server.wait_for_sockets(2).await.unwrap();

    let response = server
        .delete_auth("/api/v1/profile/me/sessions?keepCurrent=true", &keep.access_token)
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["revoked"], 1);

    let event = other_socket.next_event().await.unwrap();
    assert_eq!(event["type"], "session_revoked");
    assert_eq!(event["sessionId"], other.session_id.as_str());
    assert_eq!(event["reason"], "bulk");

    kept_socket.close().await.unwrap();
    server.wait_for_sockets(1).await.unwrap();
}

#[tokio::test]
async fn test_refresh_reuse_pushes_reuse_detected() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_, session) = register_and_login(&server).await.unwrap();

    let mut socket = server.connect_ws(&session.access_token).await.unwrap();
    server.wait_for_sockets(1).await.unwrap();

    let response = server
        .post_with_cookie("/api/v1/auth/refresh", &session.refresh_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server
        .post_with_cookie("/api/v1/auth/refresh", &session.refresh_token)
        .await
        .unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();

    let event = socket.next_event().await.unwrap();
    assert_eq!(event["type"], "session_revoked");
    assert_eq!(event["reason"], "reuse_detected");
}

#[tokio::test]
async fn test_socket_cap_rejects_sixth_connection() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_, session) = register_and_login(&server).await.unwrap();

    let mut admitted = Vec::new();
    for _ in 0..5 {
        admitted.push(server.connect_ws(&session.access_token).await.unwrap());
    }
    server.wait_for_sockets(5).await.unwrap();

    let mut rejected = server.connect_ws(&session.access_token).await.unwrap();
    let event = rejected.next_event().await.unwrap();
    assert_eq!(event["type"], "rate_limited");
    assert_eq!(event["reason"], "user_socket_limit");
    assert_eq!(event["limit"], 5);

    let code = rejected.expect_close().await.unwrap();
    assert_eq!(code, Some(4008));

    // the rejected socket never counted
    server.wait_for_sockets(5).await.unwrap();
}

#[tokio::test]
async fn test_invalid_token_is_refused() {
    let server = TestServer::start().await.expect("Failed to start server");

    let mut socket = server.connect_ws("not-a-jwt").await.unwrap();
    let event = socket.next_event().await.unwrap();
    assert_eq!(event["type"], "auth_error");
    assert_eq!(socket.expect_close().await.unwrap(), Some(4004));
}

#[tokio::test]
async fn test_auth_payload_after_connect() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (account, watched) = register_and_login(&server).await.unwrap();
    let admin = login(&server, &account).await.unwrap();

    let mut socket = server.connect_ws_anonymous().await.unwrap();
    socket
        .send_json(&json!({ "accessToken": watched.access_token }))
        .await
        .unwrap();
    server.wait_for_sockets(1).await.unwrap();

    let path = format!("/api/v1/profile/me/sessions/{}", watched.session_id);
    let response = server.delete_auth(&path, &admin.access_token).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let event = socket.next_event().await.unwrap();
    assert_eq!(event["sessionId"], watched.session_id.as_str());
}

#[tokio::test]
async fn test_anonymous_socket_with_bad_payload_is_refused() {
    let server = TestServer::start().await.expect("Failed to start server");

    let mut socket = server.connect_ws_anonymous().await.unwrap();
    socket.send_json(&json!({ "hello": "world" })).await.unwrap();

    let event = socket.next_event().await.unwrap();
    assert_eq!(event["type"], "auth_error");
    assert_eq!(socket.expect_close().await.unwrap(), Some(4004));
}

#[tokio::test]
async fn test_closed_socket_leaves_registry() {
    let server = TestServer::start().await.expect("Failed to start server");
    let (_, session) = register_and_login(&server).await.unwrap();

    let socket = server.connect_ws(&session.access_token).await.unwrap();
    server.wait_for_sockets(1).await.unwrap();

    socket.close().await.unwrap();
    server.wait_for_sockets(0).await.unwrap();
}

#[tokio::test]
async fn test_unresponsive_socket_frees_its_slot() {
    let mut config = test_config();
    config.realtime.ping_interval_ms = 50;
    config.realtime.ping_timeout_ms = 100;
    let server = TestServer::start_with_config(config)
        .await
        .expect("Failed to start server");
    let (_, session) = register_and_login(&server).await.unwrap();

    // never polled, so the server's pings go unanswered
    let _silent = server.connect_ws(&session.access_token).await.unwrap();
    server.wait_for_sockets(1).await.unwrap();
    server.wait_for_sockets(0).await.unwrap();
}
