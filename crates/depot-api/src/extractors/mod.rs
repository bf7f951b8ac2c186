//! Axum extractors for request handling
//!
//! Authentication, client metadata, path parameters, and validated bodies.

mod auth;
mod client;
mod path;
mod validated;

pub use auth::AuthUser;
pub use client::{Client, ProxyTrust};
pub use path::SessionIdPath;
pub use validated::ValidatedJson;
