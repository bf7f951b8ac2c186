//! Connection tracking

mod registry;

pub use registry::{ConnectionId, ConnectionRegistry, RegistryStats};
