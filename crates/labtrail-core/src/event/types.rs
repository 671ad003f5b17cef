//! Event type discriminator for the sample audit trail.
//!
//! The lab service tags every domain event with a SCREAMING_SNAKE_CASE type
//! string. Types this crate does not know are not an error at the event level:
//! [`EventType::parse_known`] returns `None` and the timeline falls back to the
//! event's own description.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The event types with a dedicated narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Generic lifecycle transition.
    SampleStateChanged,
    /// Transition into `DAMAGED`.
    SampleDamaged,
    /// Transition into `CANCELLED`.
    SampleCancelled,
    ImageUploaded,
    ImageDeleted,
    /// Notes replaced or cleared.
    SampleNotesUpdated,
    AssigneesAdded,
    AssigneesRemoved,
    LabelsAdded,
    LabelsRemoved,
}

/// Error returned when parsing an unknown event type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown event type '{}': expected one of SAMPLE_STATE_CHANGED, SAMPLE_DAMAGED, \
             SAMPLE_CANCELLED, IMAGE_UPLOADED, IMAGE_DELETED, SAMPLE_NOTES_UPDATED, \
             ASSIGNEES_ADDED, ASSIGNEES_REMOVED, LABELS_ADDED, LABELS_REMOVED",
            self.raw
        )
    }
}

impl std::error::Error for UnknownEventType {}

impl EventType {
    /// All known event types in catalog order.
    pub const ALL: [Self; 10] = [
        Self::SampleStateChanged,
        Self::SampleDamaged,
        Self::SampleCancelled,
        Self::ImageUploaded,
        Self::ImageDeleted,
        Self::SampleNotesUpdated,
        Self::AssigneesAdded,
        Self::AssigneesRemoved,
        Self::LabelsAdded,
        Self::LabelsRemoved,
    ];

    /// Return the canonical wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SampleStateChanged => "SAMPLE_STATE_CHANGED",
            Self::SampleDamaged => "SAMPLE_DAMAGED",
            Self::SampleCancelled => "SAMPLE_CANCELLED",
            Self::ImageUploaded => "IMAGE_UPLOADED",
            Self::ImageDeleted => "IMAGE_DELETED",
            Self::SampleNotesUpdated => "SAMPLE_NOTES_UPDATED",
            Self::AssigneesAdded => "ASSIGNEES_ADDED",
            Self::AssigneesRemoved => "ASSIGNEES_REMOVED",
            Self::LabelsAdded => "LABELS_ADDED",
            Self::LabelsRemoved => "LABELS_REMOVED",
        }
    }

    /// Parse a wire string, `None` for types without a dedicated narrative.
    #[must_use]
    pub fn parse_known(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|et| et.as_str() == s)
            .ok_or_else(|| UnknownEventType { raw: s.to_string() })
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_fromstr_roundtrip() {
        for et in EventType::ALL {
            let reparsed: EventType = et.to_string().parse().expect("should roundtrip");
            assert_eq!(et, reparsed);
        }
    }

    #[test]
    fn fromstr_is_case_sensitive() {
        assert!("labels_added".parse::<EventType>().is_err());
        assert_eq!(
            EventType::parse_known("LABELS_ADDED"),
            Some(EventType::LabelsAdded)
        );
    }

    #[test]
    fn unknown_type_is_not_known() {
        assert_eq!(EventType::parse_known("SAMPLE_PRINTED"), None);
        let err = "SAMPLE_PRINTED".parse::<EventType>().unwrap_err();
        assert_eq!(err.raw, "SAMPLE_PRINTED");
        assert!(err.to_string().contains("expected one of"));
    }

    #[test]
    fn error_display_includes_valid_options() {
        let msg = UnknownEventType { raw: "nope".into() }.to_string();
        for et in EventType::ALL {
            assert!(msg.contains(et.as_str()), "missing {}", et.as_str());
        }
    }

    #[test]
    fn serde_uses_wire_strings() {
        let json = serde_json::to_string(&EventType::SampleNotesUpdated).expect("serialize");
        assert_eq!(json, "\"SAMPLE_NOTES_UPDATED\"");
        assert!(serde_json::from_str::<EventType>("\"SAMPLE_PRINTED\"").is_err());
    }
}
