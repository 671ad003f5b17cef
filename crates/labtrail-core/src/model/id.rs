//! String identifiers for server-owned entities.
//!
//! The lab service is inconsistent about id encoding (numeric primary keys on
//! some endpoints, UUID strings on others), so every id type accepts either a
//! JSON string or a JSON integer and always serializes back as a string.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the identifier text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into_string()))
            }
        }
    };
}

string_id!(
    /// Identifier of a laboratory sample.
    SampleId
);
string_id!(
    /// Identifier of a catalog label.
    LabelId
);
string_id!(
    /// Identifier of a lab user (assignee or event author).
    UserId
);
string_id!(
    /// Identifier of an uploaded sample image.
    ImageId
);
string_id!(
    /// Identifier of a domain event.
    EventId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_numeric_and_text_ids() {
        let numeric: SampleId = serde_json::from_str("42").expect("numeric id");
        let text: SampleId = serde_json::from_str("\"s-42\"").expect("text id");
        assert_eq!(numeric.as_str(), "42");
        assert_eq!(text.as_str(), "s-42");
    }

    #[test]
    fn serializes_as_string() {
        let id = LabelId::new("7");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"7\"");
    }

    #[test]
    fn rejects_non_scalar_ids() {
        assert!(serde_json::from_str::<UserId>("{\"id\":1}").is_err());
        assert!(serde_json::from_str::<UserId>("null").is_err());
    }
}
