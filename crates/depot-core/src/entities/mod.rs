//! Domain entities - core business objects

mod activity;
mod session;
mod user;

pub use activity::{ActivityAction, ActivityEntry};
pub use session::{ClientInfo, RefreshTokenRecord, Session, SessionStatus};
pub use user::{User, DEFAULT_ROLE};
