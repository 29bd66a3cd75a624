//! Correlation identifiers
//!
//! A `SessionId` is minted once per editor session and stamped on every log
//! event the session emits. A `RequestId` identifies one host gesture inside
//! that session (a drop, a create, a delete).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! correlation_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh identifier (UUIDv7, so ids sort by creation time)
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Wrap an existing identifier, e.g. one handed over by the host
            pub fn from_string(s: String) -> Self {
                Self(s)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

correlation_id!(
    /// Identifier of one editor session (one tree, one scope, one variant)
    SessionId
);

correlation_id!(
    /// Identifier of a single host-triggered operation within a session
    RequestId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_request_id_display_matches_as_str() {
        let id = RequestId::new();
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn test_from_string_preserves_value() {
        let id = SessionId::from_string("session-from-host".to_string());
        assert_eq!(id.as_str(), "session-from-host");
    }

    #[test]
    fn test_serialization() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
