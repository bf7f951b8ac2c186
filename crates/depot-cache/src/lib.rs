//! # depot-cache
//!
//! Redis layer for short-lived authentication state.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Token Blacklist**: Revoked access token identifiers, kept until natural expiry
//! - **Attempt Limiter**: Fixed-window counters for login and password-change attempts
//!
//! ## Example
//!
//! ```ignore
//! use depot_cache::{RedisPool, RedisPoolConfig, RedisTokenBlacklist};
//! use depot_core::TokenBlacklist;
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let blacklist = RedisTokenBlacklist::new(pool.clone());
//! blacklist.add(&claims.jti, 600, "logout").await?;
//! ```

pub mod pool;
pub mod store;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult, SharedRedisPool};

// Re-export store types
pub use store::{RedisAttemptLimiter, RedisTokenBlacklist};
