//! Ports implemented by the infrastructure crates

mod ports;
mod repositories;

pub use ports::{
    AttemptDecision, AttemptLimiter, Clock, NoopEventSink, OtpProvisioning, OtpVerifier,
    RandomSource, SecretHasher, SessionEventSink, SystemClock, TokenBlacklist,
};
pub use repositories::{ActivityRepository, RepoResult, SessionRepository, UserRepository};
