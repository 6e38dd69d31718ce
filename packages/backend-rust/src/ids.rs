//! Opaque identifier types.
//!
//! Identifiers arrive from clients and from historical data in more than one
//! shape (24-char ObjectId hex in either case, short numeric ids, uuids).
//! Each newtype stores one canonical string so equality and map lookups
//! never depend on how the caller spelled the key.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const MAX_ID_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("{kind} is empty")]
    Empty { kind: &'static str },
    #[error("{kind} exceeds {} characters", MAX_ID_LEN)]
    TooLong { kind: &'static str },
    #[error("{kind} contains invalid character {ch:?}")]
    InvalidChar { kind: &'static str, ch: char },
}

fn canonicalize(kind: &'static str, raw: &str) -> Result<String, IdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty { kind });
    }
    if trimmed.len() > MAX_ID_LEN {
        return Err(IdError::TooLong { kind });
    }
    if let Some(ch) = trimmed
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(IdError::InvalidChar { kind, ch });
    }
    if is_object_id_shaped(trimmed) {
        return Ok(trimmed.to_ascii_lowercase());
    }
    Ok(trimmed.to_string())
}

fn is_object_id_shaped(value: &str) -> bool {
    value.len() == 24 && value.chars().all(|c| c.is_ascii_hexdigit())
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: &str) -> Result<Self, IdError> {
                canonicalize($kind, raw).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id!(
    /// Learner (user) key
    LearnerId,
    "learnerId"
);
opaque_id!(
    /// Catalog step key
    StepId,
    "stepId"
);
opaque_id!(
    /// Vocabulary item key
    ItemId,
    "itemId"
);
opaque_id!(AttemptId, "attemptId");

impl AttemptId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_case_is_normalized() {
        let upper = LearnerId::parse("65A1B2C3D4E5F60718293A4B").unwrap();
        let lower = LearnerId::parse("65a1b2c3d4e5f60718293a4b").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "65a1b2c3d4e5f60718293a4b");
    }

    #[test]
    fn short_ids_are_kept_verbatim() {
        let id = LearnerId::parse(" 42 ").unwrap();
        assert_eq!(id.as_str(), "42");
        let mixed = StepId::parse("Intro_Step-1").unwrap();
        assert_eq!(mixed.as_str(), "Intro_Step-1");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert_eq!(LearnerId::parse("  "), Err(IdError::Empty { kind: "learnerId" }));
        assert!(matches!(
            StepId::parse("a/b"),
            Err(IdError::InvalidChar { ch: '/', .. })
        ));
        assert!(matches!(
            ItemId::parse(&"x".repeat(65)),
            Err(IdError::TooLong { .. })
        ));
    }

    #[test]
    fn serde_goes_through_parse() {
        let id: StepId = serde_json::from_str("\"ABCDEF0123456789ABCDEF01\"").unwrap();
        assert_eq!(id.as_str(), "abcdef0123456789abcdef01");
        assert!(serde_json::from_str::<StepId>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abcdef0123456789abcdef01\"");
    }

    #[test]
    fn generated_attempt_ids_parse() {
        let id = AttemptId::generate();
        assert_eq!(AttemptId::parse(id.as_str()).unwrap(), id);
    }
}
