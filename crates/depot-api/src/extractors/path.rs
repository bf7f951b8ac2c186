//! Path parameter extractors

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use depot_core::SessionId;

use crate::response::ApiError;

/// Session id from the `:id` path segment
#[derive(Debug, Clone, Copy)]
pub struct SessionIdPath(pub SessionId);

#[async_trait]
impl<S> FromRequestParts<S> for SessionIdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_path(e.to_string()))?;

        raw.parse()
            .map(SessionIdPath)
            .map_err(|_| ApiError::invalid_path("Invalid session id format"))
    }
}
