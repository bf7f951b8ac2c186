//! Business logic services
//!
//! Each service borrows the shared [`ServiceContext`] and orchestrates the
//! repositories and ports it holds.

pub mod account;
pub mod activity;
pub mod auth;
pub mod context;
pub mod error;
pub mod mfa;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use account::AccountService;
pub use activity::ActivityService;
pub use auth::{AuthOutcome, AuthService, Principal};
pub use context::{ServiceContext, ServiceContextBuilder, ServiceSettings};
pub use error::{ServiceError, ServiceResult};
pub use mfa::MfaService;
pub use session::{CreatedSession, RotatedSession, SessionService};
