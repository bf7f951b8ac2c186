//! Application state
//!
//! Holds the shared state for the Axum application: the service context,
//! the realtime gateway, configuration, and readiness probes.

mod probe;

use std::sync::Arc;

use axum::extract::FromRef;
use depot_common::AppConfig;
use depot_gateway::{ConnectionRegistry, GatewayState};
use depot_service::ServiceContext;

use crate::cookies::RefreshCookie;
use crate::extractors::ProxyTrust;

pub use probe::{InfraProbe, ReadinessProbe, StaticProbe};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    service_context: Arc<ServiceContext>,
    gateway: GatewayState,
    probe: Arc<dyn ReadinessProbe>,
    refresh_cookie: Arc<RefreshCookie>,
    config: Arc<AppConfig>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(
        service_context: ServiceContext,
        gateway: GatewayState,
        probe: Arc<dyn ReadinessProbe>,
        config: AppConfig,
    ) -> Self {
        let refresh_cookie = RefreshCookie::new(&config.cookie, config.app.env.is_production());
        Self {
            service_context: Arc::new(service_context),
            gateway,
            probe,
            refresh_cookie: Arc::new(refresh_cookie),
            config: Arc::new(config),
        }
    }

    /// Get the service context
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        self.gateway.registry()
    }

    pub fn probe(&self) -> &dyn ReadinessProbe {
        self.probe.as_ref()
    }

    pub fn refresh_cookie(&self) -> &RefreshCookie {
        &self.refresh_cookie
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl FromRef<AppState> for GatewayState {
    fn from_ref(state: &AppState) -> Self {
        state.gateway.clone()
    }
}

impl FromRef<AppState> for ProxyTrust {
    fn from_ref(state: &AppState) -> Self {
        ProxyTrust(state.config.api.trust_proxy_headers)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gateway", &self.gateway)
            .field("config", &"AppConfig")
            .finish_non_exhaustive()
    }
}
