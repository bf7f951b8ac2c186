//! Test fixtures and data generators
//!
//! Provides reusable request bodies, response shapes, and the register then
//! log in flow most tests start from.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use chrono::Utc;
use depot_common::TotpVerifier;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::helpers::{assert_json, refresh_cookie, TestServer};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Registration request
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
}

impl RegisterRequest {
    pub fn unique() -> Self {
        Self {
            username: format!("user{}", unique_suffix()),
        }
    }
}

/// OTP login request
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub token: String,
}

/// Registration response
#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub username: String,
    pub otpauth_url: String,
    pub recovery_code: String,
    pub secret: String,
}

/// Auth response
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub session_id: String,
    pub user: UserSummary,
    #[serde(default)]
    pub new_recovery_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
}

/// Session list entry
#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    pub id: String,
    pub revoked_at: Option<String>,
    pub revoked_reason: Option<String>,
    pub is_current: bool,
    pub status: String,
}

/// A logged-in session as a browser would hold it
#[derive(Debug)]
pub struct LoggedIn {
    pub access_token: String,
    pub refresh_token: String,
    pub session_id: String,
}

/// A registered account plus everything needed to log in again
#[derive(Debug)]
pub struct Account {
    pub username: String,
    pub user_id: String,
    pub secret: String,
    pub recovery_code: String,
}

impl Account {
    /// Code the authenticator app would show right now
    pub fn current_code(&self) -> Result<String> {
        TotpVerifier::new("Depot")
            .code_at(&self.secret, Utc::now())
            .context("secret is not valid base32")
    }
}

/// Register a fresh account
pub async fn register(server: &TestServer) -> Result<Account> {
    let request = RegisterRequest::unique();
    let response = server.post("/api/v1/auth/register", &request).await?;
    let registered: RegisterResponse = assert_json(response, StatusCode::CREATED).await?;

    Ok(Account {
        username: registered.username,
        user_id: registered.user_id,
        secret: registered.secret,
        recovery_code: registered.recovery_code,
    })
}

/// Log in with the current OTP code
pub async fn login(server: &TestServer, account: &Account) -> Result<LoggedIn> {
    let request = LoginRequest {
        username: account.username.clone(),
        token: account.current_code()?,
    };
    let response = server.post("/api/v1/auth/login", &request).await?;
    let cookie = refresh_cookie(&response).context("login set no refresh cookie")?;
    let auth: AuthResponse = assert_json(response, StatusCode::OK).await?;

    Ok(LoggedIn {
        access_token: auth.access_token,
        refresh_token: cookie,
        session_id: auth.session_id,
    })
}

/// Register and log in once
pub async fn register_and_login(server: &TestServer) -> Result<(Account, LoggedIn)> {
    let account = register(server).await?;
    let session = login(server, &account).await?;
    Ok((account, session))
}
