//! Connection liveness
//!
//! The server pings every socket on an interval. Any inbound frame, pongs
//! included, counts as activity; a socket silent for longer than one interval
//! plus the ping timeout is dropped.

use std::sync::Arc;
use std::time::Duration;

use depot_common::RealtimeConfig;
use parking_lot::Mutex;
use tokio::time::Instant;

/// Ping cadence and the silence tolerated after it
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Heartbeat {
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.ping_interval_ms.max(1)),
            timeout: Duration::from_millis(config.ping_timeout_ms.max(1)),
        }
    }

    /// Longest silence before the socket counts as dead
    pub fn deadline(&self) -> Duration {
        self.interval + self.timeout
    }

    /// How often the watchdog compares the silence against the deadline
    pub fn check_period(&self) -> Duration {
        (self.interval.min(self.timeout) / 2).max(Duration::from_millis(1))
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::from_config(&RealtimeConfig::default())
    }
}

/// Time of the last inbound frame, shared by the read loop and the watchdog
#[derive(Debug, Clone)]
pub struct LastSeen(Arc<Mutex<Instant>>);

impl LastSeen {
    pub fn now() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }

    pub fn touch(&self) {
        *self.0.lock() = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.0.lock().elapsed()
    }
}
