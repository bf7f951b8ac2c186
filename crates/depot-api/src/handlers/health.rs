//! Health check handlers
//!
//! Endpoints for liveness and readiness probes.

use axum::{extract::State, http::StatusCode, Json};
use depot_service::dto::{HealthResponse, ReadinessResponse, RealtimeCounts};

use crate::state::AppState;

/// Basic health check (liveness probe)
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Readiness check with dependency health and live connection counts
///
/// GET /health/ready
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let db_healthy = state.probe().database().await;
    let redis_healthy = state.probe().redis().await;

    let stats = state.registry().stats();
    let realtime = RealtimeCounts {
        sessions: stats.sessions,
        users: stats.users,
        sockets: stats.sockets,
    };

    let response = ReadinessResponse::ready(db_healthy, redis_healthy, realtime);
    let status = if db_healthy && redis_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
