//! Handshake authentication
//!
//! A realtime client proves who it is with the same access token it uses for
//! HTTP. The token may travel in the `Authorization` header, in an auth
//! payload, or in the query string, checked in that order.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use depot_common::TokenIssuer;
use depot_core::{SessionId, UserId};
use serde::Deserialize;
use thiserror::Error;

/// Credentials a client may send as its auth payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthPayload {
    #[serde(default, rename = "accessToken")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Everything a connecting client offered for authentication
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub authorization: Option<String>,
    pub auth: Option<AuthPayload>,
    pub query: HashMap<String, String>,
}

impl Handshake {
    /// Collect the header and query parts of an upgrade request
    pub fn from_request(headers: &HeaderMap, query: HashMap<String, String>) -> Self {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            authorization,
            auth: None,
            query,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthPayload) -> Self {
        self.auth = Some(auth);
        self
    }

    /// First non-empty token in precedence order
    pub fn credential(&self) -> Option<&str> {
        let from_header = self.authorization.as_deref().and_then(bearer_token);
        let from_payload = self.auth.as_ref().and_then(|auth| {
            non_empty(auth.access_token.as_deref()).or_else(|| non_empty(auth.token.as_deref()))
        });
        let from_query = || {
            non_empty(self.query.get("accessToken").map(String::as_str))
                .or_else(|| non_empty(self.query.get("token").map(String::as_str)))
        };

        from_header.or(from_payload).or_else(from_query)
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    non_empty(Some(token.trim()))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Who an authenticated connection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionIdentity {
    pub user_id: UserId,
    pub session_id: SessionId,
}

/// Handshake authentication failure
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no access token presented")]
    MissingCredential,

    #[error("access token rejected")]
    InvalidToken,

    #[error("access token lacks user or session id")]
    MissingClaims,
}

/// Verifies handshake tokens with the access token key ring
#[derive(Debug, Clone)]
pub struct RealtimeAuthenticator {
    issuer: Arc<TokenIssuer>,
}

impl RealtimeAuthenticator {
    pub fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }

    /// Resolve the user and session a handshake belongs to
    ///
    /// # Errors
    /// Fails when no token is present, the token does not verify, or its
    /// claims lack a usable user or session id
    pub fn authenticate(&self, handshake: &Handshake) -> Result<ConnectionIdentity, AuthError> {
        let token = handshake.credential().ok_or(AuthError::MissingCredential)?;
        let claims = self.issuer.verify(token).ok_or(AuthError::InvalidToken)?;

        match (claims.user_id(), claims.session_id()) {
            (Some(user_id), Some(session_id)) => Ok(ConnectionIdentity {
                user_id,
                session_id,
            }),
            _ => Err(AuthError::MissingClaims),
        }
    }
}
