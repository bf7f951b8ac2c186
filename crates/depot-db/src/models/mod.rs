//! Database models - SQLx-compatible structs for PostgreSQL tables

mod activity;
mod session;
mod user;

pub use activity::ActivityModel;
pub use session::{RefreshTokenModel, SessionModel};
pub use user::UserModel;
