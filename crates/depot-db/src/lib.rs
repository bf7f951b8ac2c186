//! # depot-db
//!
//! Database layer implementing the depot-core repository traits with
//! PostgreSQL via SQLx.
//!
//! ## Overview
//!
//! - Connection pool management and bundled SQL migrations
//! - Database models with SQLx `FromRow` derives
//! - Model → entity mappers
//! - Repository implementations for users, sessions, and the activity log
//!
//! ## Usage
//!
//! ```rust,ignore
//! use depot_db::{create_pool, run_migrations, PgSessionRepository};
//!
//! async fn example(config: &depot_common::DatabaseConfig) -> anyhow::Result<()> {
//!     let pool = create_pool(config).await?;
//!     run_migrations(&pool).await?;
//!     let sessions = PgSessionRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, run_migrations, run_migrations_from, PgPool, MIGRATIONS_DIR};
pub use repositories::{PgActivityRepository, PgSessionRepository, PgUserRepository};
