//! Gateway state
//!
//! Shared dependencies of the realtime endpoint.

use std::sync::Arc;

use crate::auth::RealtimeAuthenticator;
use crate::connection::ConnectionRegistry;
use crate::server::heartbeat::Heartbeat;

/// Realtime endpoint state
#[derive(Clone)]
pub struct GatewayState {
    registry: Arc<ConnectionRegistry>,
    authenticator: Arc<RealtimeAuthenticator>,
    heartbeat: Heartbeat,
}

impl GatewayState {
    pub fn new(registry: Arc<ConnectionRegistry>, authenticator: RealtimeAuthenticator) -> Self {
        Self {
            registry,
            authenticator: Arc::new(authenticator),
            heartbeat: Heartbeat::default(),
        }
    }

    /// Replace the ping cadence
    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Get the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn authenticator(&self) -> &RealtimeAuthenticator {
        &self.authenticator
    }

    pub fn heartbeat(&self) -> Heartbeat {
        self.heartbeat
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("registry", &self.registry)
            .field("heartbeat", &self.heartbeat)
            .finish_non_exhaustive()
    }
}
