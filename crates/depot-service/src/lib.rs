//! # depot-service
//!
//! Application layer: login, refresh rotation, session management, and the
//! DTOs exchanged with the HTTP surface.

pub mod dto;
pub mod memory;
pub mod services;
pub mod user_agent;

pub use services::{
    AccountService, ActivityService, AuthOutcome, AuthService, MfaService, Principal,
    ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult, ServiceSettings,
    SessionService,
};
