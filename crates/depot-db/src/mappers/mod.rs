//! Entity to model mappers
//!
//! Conversions from database rows (`models`) into domain entities (depot-core).

mod activity;
mod session;
mod user;
