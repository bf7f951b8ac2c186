//! Server setup and initialization
//!
//! Wires repositories, caches, and the realtime registry into one
//! [`AppState`] and serves the HTTP and WebSocket routes from one process.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use depot_cache::{RedisAttemptLimiter, RedisPool, RedisTokenBlacklist};
use depot_common::{AppConfig, AppError, OsRandom, TokenIssuer, TotpVerifier};
use depot_core::traits::{Clock, RandomSource, SessionEventSink, SystemClock};
use depot_db::{
    create_pool, run_migrations, PgActivityRepository, PgSessionRepository, PgUserRepository,
};
use depot_gateway::{ConnectionRegistry, GatewayState, Heartbeat, RealtimeAuthenticator};
use depot_service::memory::{
    InMemoryActivityRepository, InMemoryAttemptLimiter, InMemoryBlacklist,
    InMemorySessionRepository, InMemoryUserRepository,
};
use depot_service::{ServiceContextBuilder, ServiceSettings};
use tokio::net::TcpListener;
use tracing::info;

use crate::middleware::{apply_middleware, apply_middleware_with_config};
use crate::routes::{create_router, health_routes};
use crate::state::{AppState, InfraProbe, StaticProbe};

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let config = state.config();
    let api = apply_middleware_with_config(
        create_router(),
        &config.rate_limit,
        &config.cors,
        config.app.env.is_production(),
        config.api.trust_proxy_headers,
    );
    // health probes and the socket endpoint are not rate limited
    let public = apply_middleware(health_routes().merge(depot_gateway::router()));

    api.merge(public).with_state(state)
}

/// Initialize PostgreSQL, Redis, and the realtime registry
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&config.database)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .map_err(|e| AppError::Database(format!("migrations failed: {e}")))?;
        info!("Database migrations applied");
    }

    info!("Connecting to Redis...");
    let redis = RedisPool::from_config(&config.redis).map_err(|e| AppError::Cache(e.to_string()))?;
    info!("Redis pool created");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let random: Arc<dyn RandomSource> = Arc::new(OsRandom);
    let issuer = Arc::new(TokenIssuer::new(&config.jwt, clock.clone(), random.clone())?);
    let registry = ConnectionRegistry::new_shared(&config.realtime);

    let service_context = ServiceContextBuilder::new()
        .user_repo(Arc::new(PgUserRepository::new(pool.clone())))
        .session_repo(Arc::new(PgSessionRepository::new(pool.clone())))
        .activity_repo(Arc::new(PgActivityRepository::new(pool.clone())))
        .blacklist(Arc::new(RedisTokenBlacklist::new(redis.clone())))
        .limiter(Arc::new(RedisAttemptLimiter::new(redis.clone())))
        .token_issuer(issuer.clone())
        .otp(Arc::new(TotpVerifier::new(config.otp.issuer.clone())))
        .clock(clock)
        .random(random)
        .events(registry.clone() as Arc<dyn SessionEventSink>)
        .settings(ServiceSettings::from_config(&config))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let gateway = GatewayState::new(registry, RealtimeAuthenticator::new(issuer))
        .with_heartbeat(Heartbeat::from_config(&config.realtime));
    let probe = Arc::new(InfraProbe::new(pool, Arc::new(redis)));

    Ok(AppState::new(service_context, gateway, probe, config))
}

/// State over in-process stores. Nothing survives a restart; used for local
/// development without PostgreSQL or Redis, and for end-to-end tests.
pub fn create_memory_state(config: AppConfig) -> Result<AppState, AppError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let random: Arc<dyn RandomSource> = Arc::new(OsRandom);
    let issuer = Arc::new(TokenIssuer::new(&config.jwt, clock.clone(), random.clone())?);
    let registry = ConnectionRegistry::new_shared(&config.realtime);

    let service_context = ServiceContextBuilder::new()
        .user_repo(Arc::new(InMemoryUserRepository::new()))
        .session_repo(Arc::new(InMemorySessionRepository::new()))
        .activity_repo(Arc::new(InMemoryActivityRepository::new()))
        .blacklist(Arc::new(InMemoryBlacklist::new(clock.clone())))
        .limiter(Arc::new(InMemoryAttemptLimiter::new(clock.clone())))
        .token_issuer(issuer.clone())
        .otp(Arc::new(TotpVerifier::new(config.otp.issuer.clone())))
        .clock(clock)
        .random(random)
        .events(registry.clone() as Arc<dyn SessionEventSink>)
        .settings(ServiceSettings::from_config(&config))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let gateway = GatewayState::new(registry, RealtimeAuthenticator::new(issuer))
        .with_heartbeat(Heartbeat::from_config(&config.realtime));

    Ok(AppState::new(
        service_context,
        gateway,
        Arc::new(StaticProbe::default()),
        config,
    ))
}

/// Run the HTTP server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("Server listening on http://{}", addr);

    // peer addresses feed the login limiter and the per-IP rate limit
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = format!("{}:{}", config.api.host, config.api.port)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid listen address: {e}")))?;

    let state = create_app_state(config).await?;
    let app = create_app(state);

    run_server(app, addr).await
}
