//! Fixed-window attempt counting in Redis.
//!
//! The counter under `rate_limit:{key}` starts its window on the first
//! attempt. Once it reaches the limit, callers are blocked for whatever is
//! left of the window.

use async_trait::async_trait;
use depot_core::{AttemptDecision, AttemptLimiter, RepoResult};
use tracing::{debug, instrument};

use crate::pool::RedisPool;

/// Key prefix for attempt counters
const ATTEMPT_PREFIX: &str = "rate_limit:";

/// Redis-backed `AttemptLimiter`
#[derive(Clone, Debug)]
pub struct RedisAttemptLimiter {
    pool: RedisPool,
}

impl RedisAttemptLimiter {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn key(key: &str) -> String {
        format!("{ATTEMPT_PREFIX}{key}")
    }
}

/// Remaining window for a blocked key, at least one second
fn retry_after(ttl: Option<i64>, window_secs: u64) -> u64 {
    match ttl {
        Some(secs) if secs > 0 => secs as u64,
        // -1: counter without expiry, treat as a fresh window
        Some(-1) => window_secs,
        _ => 1,
    }
}

#[async_trait]
impl AttemptLimiter for RedisAttemptLimiter {
    #[instrument(skip(self))]
    async fn check_and_increment(
        &self,
        key: &str,
        limit: u32,
        window_secs: u64,
    ) -> RepoResult<AttemptDecision> {
        let redis_key = Self::key(key);

        let current = self.pool.get_counter(&redis_key).await?;
        if current >= i64::from(limit) {
            let ttl = self.pool.ttl(&redis_key).await?;
            if ttl == Some(-1) {
                self.pool.expire(&redis_key, window_secs).await?;
            }
            let retry_after_secs = retry_after(ttl, window_secs);
            debug!(retry_after_secs, "Attempt blocked");
            return Ok(AttemptDecision::Blocked { retry_after_secs });
        }

        let attempts = self.pool.incr(&redis_key).await?;
        if attempts == 1 {
            self.pool.expire(&redis_key, window_secs).await?;
        }

        Ok(AttemptDecision::Allowed {
            attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
        })
    }

    #[instrument(skip(self))]
    async fn reset(&self, key: &str) -> RepoResult<()> {
        self.pool.delete(&Self::key(key)).await?;
        Ok(())
    }
}
