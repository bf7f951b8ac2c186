//! # depot-core
//!
//! Domain layer for session-backed authentication: users, login sessions,
//! refresh token chains, the activity log, and the ports the service layer
//! depends on. This crate has zero dependencies on infrastructure (database,
//! cache, web framework).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    ActivityAction, ActivityEntry, ClientInfo, RefreshTokenRecord, Session, SessionStatus, User,
    DEFAULT_ROLE,
};
pub use error::DomainError;
pub use traits::{
    ActivityRepository, AttemptDecision, AttemptLimiter, Clock, NoopEventSink, OtpProvisioning,
    OtpVerifier, RandomSource, RepoResult, SecretHasher, SessionEventSink, SessionRepository,
    SystemClock, TokenBlacklist, UserRepository,
};
pub use value_objects::{
    RefreshArtifact, RefreshTokenId, RevocationReason, SessionId, UserId, ARTIFACT_SEPARATOR,
};
