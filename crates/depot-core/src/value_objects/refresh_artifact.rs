//! Refresh artifact - the opaque `"{session_id}.{secret}"` string handed to clients
//!
//! The artifact is parsed once at the boundary. The prefix is kept as raw text so
//! that a malformed or foreign prefix can still be compared against the session
//! it was presented for.

use std::fmt;

use crate::value_objects::SessionId;

/// Separator between the session prefix and the secret
pub const ARTIFACT_SEPARATOR: char = '.';

/// Parsed refresh artifact
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshArtifact {
    prefix: String,
    secret: String,
}

impl RefreshArtifact {
    /// Build an artifact for a freshly minted secret
    pub fn new(session_id: SessionId, secret: impl Into<String>) -> Self {
        Self {
            prefix: session_id.to_string(),
            secret: secret.into(),
        }
    }

    /// Split on the first separator. Returns `None` when there is no separator.
    pub fn parse(raw: &str) -> Option<Self> {
        let (prefix, secret) = raw.split_once(ARTIFACT_SEPARATOR)?;
        Some(Self {
            prefix: prefix.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Raw prefix text as presented
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefix as a session id, if it is one in canonical form
    pub fn session_id(&self) -> Option<SessionId> {
        self.prefix
            .parse()
            .ok()
            .filter(|id: &SessionId| self.belongs_to(*id))
    }

    /// Whether the prefix is exactly the given session's id
    pub fn belongs_to(&self, session_id: SessionId) -> bool {
        self.prefix == session_id.to_string()
    }

    /// The secret part
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Display for RefreshArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, ARTIFACT_SEPARATOR, self.secret)
    }
}

// Never print the secret
impl fmt::Debug for RefreshArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshArtifact")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_on_first_separator() {
        let sid = SessionId::new();
        let artifact = RefreshArtifact::parse(&format!("{sid}.abc.def")).unwrap();
        assert_eq!(artifact.session_id(), Some(sid));
        assert_eq!(artifact.secret(), "abc.def");
    }

    #[test]
    fn test_parse_without_separator() {
        assert!(RefreshArtifact::parse("no-separator-here").is_none());
    }

    #[test]
    fn test_foreign_prefix() {
        let artifact = RefreshArtifact::parse("garbage.secret").unwrap();
        assert_eq!(artifact.session_id(), None);
        assert!(!artifact.belongs_to(SessionId::new()));
        assert_eq!(artifact.prefix(), "garbage");
    }

    #[test]
    fn test_other_spellings_of_the_session_id_do_not_match() {
        let sid = SessionId::new();
        let canonical = sid.to_string();
        let spellings = [
            canonical.to_uppercase(),
            format!("{{{canonical}}}"),
            format!("urn:uuid:{canonical}"),
            canonical.replace('-', ""),
        ];

        for prefix in spellings {
            let artifact = RefreshArtifact::parse(&format!("{prefix}.secret")).unwrap();
            assert!(!artifact.belongs_to(sid), "{prefix} matched");
            assert_eq!(artifact.session_id(), None);
        }
    }

    #[test]
    fn test_display_round_trip() {
        let sid = SessionId::new();
        let artifact = RefreshArtifact::new(sid, "deadbeef");
        assert_eq!(artifact.to_string(), format!("{sid}.deadbeef"));
        assert!(artifact.belongs_to(sid));
    }

    #[test]
    fn test_debug_hides_secret() {
        let artifact = RefreshArtifact::new(SessionId::new(), "topsecret");
        assert!(!format!("{artifact:?}").contains("topsecret"));
    }
}
