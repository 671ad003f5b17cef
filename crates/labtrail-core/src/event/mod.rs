//! Domain events of the sample audit trail.
//!
//! Events arrive from the lab service as opaque records: a type string, a
//! free-form description and a metadata object whose shape depends on the type.
//! [`kind::EventKind`] turns that into a tagged union with one strongly typed
//! payload per known type and an explicit `Unknown` fallback.
//!
//! Events are immutable. Nothing in this crate mutates or reorders them; the
//! timeline is a read projection only.

pub mod kind;
pub mod types;

pub use kind::{
    AssigneeChange, DecodedEvent, EventKind, ImageRef, LabelChange, LabelChip, NotesChange,
    StateChange, StateRef, UserRef,
};
pub use types::{EventType, UnknownEventType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{EventId, UserId};

/// A single event as delivered by `GET sampleEvents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: EventId,

    /// Wire type string. Kept raw so unknown types survive untouched.
    pub event_type: String,

    /// Server-side human description, used verbatim for unknown types.
    #[serde(default)]
    pub description: String,

    /// Type-specific payload; shape is only known after dispatch on
    /// `event_type`.
    #[serde(default)]
    pub metadata: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_avatar: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl DomainEvent {
    /// The known type of this event, if any.
    #[must_use]
    pub fn known_type(&self) -> Option<EventType> {
        EventType::parse_known(&self.event_type)
    }

    /// Decode the metadata into its typed payload.
    #[must_use]
    pub fn decode(&self) -> DecodedEvent {
        EventKind::decode(self)
    }
}

impl std::fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.created_at.to_rfc3339(),
            self.created_by_name.as_deref().unwrap_or("-"),
            self.event_type,
            self.id
        )
    }
}
