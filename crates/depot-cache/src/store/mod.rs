//! Redis-backed implementations of the short-lived state ports.

mod attempts;
mod blacklist;

pub use attempts::RedisAttemptLimiter;
pub use blacklist::RedisTokenBlacklist;
