//! Access token blacklist in Redis.
//!
//! Each revoked token identifier lives under `bl:{jti}` until the token would
//! have expired anyway.

use async_trait::async_trait;
use depot_core::{RepoResult, TokenBlacklist};
use tracing::instrument;

use crate::pool::RedisPool;

/// Key prefix for blacklisted token identifiers
const BLACKLIST_PREFIX: &str = "bl:";

/// Redis-backed `TokenBlacklist`
#[derive(Clone, Debug)]
pub struct RedisTokenBlacklist {
    pool: RedisPool,
}

impl RedisTokenBlacklist {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn key(jti: &str) -> String {
        format!("{BLACKLIST_PREFIX}{jti}")
    }
}

#[async_trait]
impl TokenBlacklist for RedisTokenBlacklist {
    #[instrument(skip(self))]
    async fn add(&self, jti: &str, ttl_secs: u64, reason: &str) -> RepoResult<()> {
        self.pool
            .set(&Self::key(jti), &reason, Some(ttl_secs.max(1)))
            .await?;
        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> RepoResult<bool> {
        Ok(self.pool.exists(&Self::key(jti)).await?)
    }

    #[instrument(skip(self))]
    async fn remove(&self, jti: &str) -> RepoResult<()> {
        self.pool.delete(&Self::key(jti)).await?;
        Ok(())
    }
}
