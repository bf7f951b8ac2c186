//! HTTP request handlers
//!
//! Thin adapters from HTTP to the service layer.

pub mod auth;
pub mod health;
pub mod mfa;
pub mod profile;
