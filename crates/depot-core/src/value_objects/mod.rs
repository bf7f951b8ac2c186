//! Value objects - immutable types that represent domain concepts

mod ids;
mod refresh_artifact;
mod revocation_reason;

pub use ids::{RefreshTokenId, SessionId, UserId};
pub use refresh_artifact::{RefreshArtifact, ARTIFACT_SEPARATOR};
pub use revocation_reason::RevocationReason;
