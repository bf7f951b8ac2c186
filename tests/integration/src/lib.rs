//! Integration test utilities for depot
//!
//! Spins up the full router over in-memory stores and drives it through
//! real HTTP and WebSocket clients.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
