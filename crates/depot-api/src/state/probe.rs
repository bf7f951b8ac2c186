//! Dependency probes for the readiness endpoint

use async_trait::async_trait;
use depot_cache::SharedRedisPool;
use depot_db::PgPool;

/// Reports whether backing stores are reachable
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn database(&self) -> bool;

    async fn redis(&self) -> bool;
}

/// PostgreSQL and Redis pools
#[derive(Clone)]
pub struct InfraProbe {
    pool: PgPool,
    redis: SharedRedisPool,
}

impl InfraProbe {
    pub fn new(pool: PgPool, redis: SharedRedisPool) -> Self {
        Self { pool, redis }
    }
}

#[async_trait]
impl ReadinessProbe for InfraProbe {
    async fn database(&self) -> bool {
        self.pool.acquire().await.is_ok()
    }

    async fn redis(&self) -> bool {
        self.redis.health_check().await.is_ok()
    }
}

/// Fixed answer, for in-process backends
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

impl Default for StaticProbe {
    fn default() -> Self {
        Self(true)
    }
}

#[async_trait]
impl ReadinessProbe for StaticProbe {
    async fn database(&self) -> bool {
        self.0
    }

    async fn redis(&self) -> bool {
        self.0
    }
}
