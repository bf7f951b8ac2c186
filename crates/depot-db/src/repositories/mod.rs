//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in depot-core.

mod activity;
mod error;
mod session;
mod user;

pub use activity::PgActivityRepository;
pub use session::PgSessionRepository;
pub use user::PgUserRepository;
