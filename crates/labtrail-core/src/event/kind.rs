//! Typed payloads for each known event type.
//!
//! Decoding never fails. A missing or mistyped metadata field is replaced by a
//! safe default and its name is recorded in [`DecodedEvent::degraded`], so the
//! timeline can still render every event.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{DomainEvent, EventType};
use crate::model::SampleState;

/// Trigger value the service records for the automatic
/// `RECEIVED -> PROCESSING` transition on first image upload.
pub const FIRST_IMAGE_UPLOAD_TRIGGER: &str = "first_image_upload";

/// A state named in event metadata.
///
/// States outside the known lifecycle are kept verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StateRef {
    Known(SampleState),
    Other(String),
}

impl StateRef {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.parse()
            .map_or_else(|_| Self::Other(raw.to_string()), Self::Known)
    }
}

/// Payload of `SAMPLE_STATE_CHANGED`, `SAMPLE_DAMAGED` and `SAMPLE_CANCELLED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateChange {
    pub old_state: Option<StateRef>,
    pub new_state: Option<StateRef>,
    pub trigger: Option<String>,
}

impl StateChange {
    /// Whether the service performed this transition on its own after the
    /// first image upload.
    #[must_use]
    pub fn is_automatic(&self) -> bool {
        self.trigger.as_deref() == Some(FIRST_IMAGE_UPLOAD_TRIGGER)
    }
}

/// Payload of `IMAGE_UPLOADED` and `IMAGE_DELETED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub filename: Option<String>,
}

/// Payload of `SAMPLE_NOTES_UPDATED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", content = "notes", rename_all = "snake_case")]
pub enum NotesChange {
    /// Notes replaced with non-blank text.
    Updated(String),
    /// Notes set to empty or null.
    Cleared,
    /// `new_notes` missing or unreadable.
    Unspecified,
}

/// A user named in assignee metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserRef {
    /// Mention handle: the username when present, otherwise the lowercased
    /// name with whitespace runs joined by `.`.
    #[must_use]
    pub fn handle(&self) -> String {
        match self.username.as_deref().map(str::trim) {
            Some(username) if !username.is_empty() => username.trim_start_matches('@').to_string(),
            _ => self
                .name
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join("."),
        }
    }

    /// Whether this user is the given actor (trimmed, case-insensitive name).
    #[must_use]
    pub fn is_named(&self, actor_name: &str) -> bool {
        let actor = actor_name.trim();
        !actor.is_empty() && self.name.trim().to_lowercase() == actor.to_lowercase()
    }
}

/// Payload of `ASSIGNEES_ADDED` and `ASSIGNEES_REMOVED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssigneeChange {
    pub users: Vec<UserRef>,
}

/// A label named in label metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelChip {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Payload of `LABELS_ADDED` and `LABELS_REMOVED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelChange {
    pub labels: Vec<LabelChip>,
}

/// An event with its metadata decoded according to its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    StateChanged(StateChange),
    Damaged(StateChange),
    Cancelled(StateChange),
    ImageUploaded(ImageRef),
    ImageDeleted(ImageRef),
    NotesUpdated(NotesChange),
    AssigneesAdded(AssigneeChange),
    AssigneesRemoved(AssigneeChange),
    LabelsAdded(LabelChange),
    LabelsRemoved(LabelChange),
    /// A type without a dedicated narrative; rendered from its description.
    Unknown {
        event_type: String,
        description: String,
    },
}

/// Result of decoding: the typed kind plus the fields that fell back to
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub kind: EventKind,
    pub degraded: Vec<&'static str>,
}

impl DecodedEvent {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Metadata reader that records every field it had to default.
struct Fields<'a> {
    map: Option<&'a Map<String, Value>>,
    degraded: Vec<&'static str>,
}

impl<'a> Fields<'a> {
    fn new(metadata: &'a Value) -> Self {
        match metadata {
            Value::Object(map) => Self {
                map: Some(map),
                degraded: Vec::new(),
            },
            Value::Null => Self {
                map: None,
                degraded: Vec::new(),
            },
            _ => Self {
                map: None,
                degraded: vec!["metadata"],
            },
        }
    }

    fn raw(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|map| map.get(key))
    }

    /// A field the event type promises; absence or a bad type degrades.
    fn required<T: DeserializeOwned>(&mut self, key: &'static str) -> Option<T> {
        let parsed = self
            .raw(key)
            .filter(|value| !value.is_null())
            .and_then(|value| T::deserialize(value).ok());
        if parsed.is_none() {
            self.degraded.push(key);
        }
        parsed
    }

    /// A field that may be absent; only a bad type degrades.
    fn optional<T: DeserializeOwned>(&mut self, key: &'static str) -> Option<T> {
        let value = self.raw(key).filter(|value| !value.is_null())?;
        let parsed = T::deserialize(value).ok();
        if parsed.is_none() {
            self.degraded.push(key);
        }
        parsed
    }

    /// A list of records; unreadable items are skipped and degrade the field.
    fn list<T>(&mut self, key: &'static str, item: impl Fn(&Value) -> Option<T>) -> Vec<T> {
        let Some(Value::Array(values)) = self.raw(key) else {
            self.degraded.push(key);
            return Vec::new();
        };
        let items: Vec<T> = values.iter().filter_map(&item).collect();
        if items.len() != values.len() {
            self.degraded.push(key);
        }
        items
    }
}

fn user_ref(value: &Value) -> Option<UserRef> {
    match value {
        Value::String(name) if !name.trim().is_empty() => Some(UserRef {
            name: name.clone(),
            username: None,
            avatar: None,
        }),
        Value::Object(_) => UserRef::deserialize(value)
            .ok()
            .filter(|user| !user.name.trim().is_empty()),
        _ => None,
    }
}

fn label_chip(value: &Value) -> Option<LabelChip> {
    match value {
        Value::String(name) if !name.trim().is_empty() => Some(LabelChip {
            name: name.clone(),
            color: None,
        }),
        Value::Object(_) => LabelChip::deserialize(value)
            .ok()
            .filter(|chip| !chip.name.trim().is_empty()),
        _ => None,
    }
}

fn state_change(fields: &mut Fields<'_>) -> StateChange {
    StateChange {
        old_state: fields
            .required::<String>("old_state")
            .map(|raw| StateRef::parse(&raw)),
        new_state: fields
            .required::<String>("new_state")
            .map(|raw| StateRef::parse(&raw)),
        trigger: fields.optional("trigger"),
    }
}

fn notes_change(fields: &mut Fields<'_>) -> NotesChange {
    match fields.raw("new_notes") {
        Some(Value::Null) => NotesChange::Cleared,
        Some(Value::String(text)) if text.trim().is_empty() => NotesChange::Cleared,
        Some(Value::String(text)) => NotesChange::Updated(text.clone()),
        _ => {
            fields.degraded.push("new_notes");
            NotesChange::Unspecified
        }
    }
}

impl EventKind {
    /// Dispatch on the event type and decode its metadata.
    #[must_use]
    pub fn decode(event: &DomainEvent) -> DecodedEvent {
        let Some(event_type) = event.known_type() else {
            return DecodedEvent {
                kind: Self::Unknown {
                    event_type: event.event_type.clone(),
                    description: event.description.clone(),
                },
                degraded: Vec::new(),
            };
        };

        let mut fields = Fields::new(&event.metadata);
        let kind = match event_type {
            EventType::SampleStateChanged => Self::StateChanged(state_change(&mut fields)),
            EventType::SampleDamaged => Self::Damaged(state_change(&mut fields)),
            EventType::SampleCancelled => Self::Cancelled(state_change(&mut fields)),
            EventType::ImageUploaded => Self::ImageUploaded(ImageRef {
                filename: fields.required("filename"),
            }),
            EventType::ImageDeleted => Self::ImageDeleted(ImageRef {
                filename: fields.required("filename"),
            }),
            EventType::SampleNotesUpdated => Self::NotesUpdated(notes_change(&mut fields)),
            EventType::AssigneesAdded => Self::AssigneesAdded(AssigneeChange {
                users: fields.list("added", user_ref),
            }),
            EventType::AssigneesRemoved => Self::AssigneesRemoved(AssigneeChange {
                users: fields.list("removed", user_ref),
            }),
            EventType::LabelsAdded => Self::LabelsAdded(LabelChange {
                labels: fields.list("added", label_chip),
            }),
            EventType::LabelsRemoved => Self::LabelsRemoved(LabelChange {
                labels: fields.list("removed", label_chip),
            }),
        };

        if !fields.degraded.is_empty() {
            debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                fields = ?fields.degraded,
                "event metadata degraded to defaults"
            );
        }

        DecodedEvent {
            kind,
            degraded: fields.degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, metadata: Value) -> DomainEvent {
        DomainEvent {
            id: "e1".into(),
            event_type: event_type.to_string(),
            description: "descripción del servidor".into(),
            metadata,
            created_by: None,
            created_by_name: None,
            created_by_avatar: None,
            created_at: "2026-03-02T10:15:00Z".parse().expect("timestamp"),
        }
    }

    #[test]
    fn state_change_with_trigger() {
        let decoded = event(
            "SAMPLE_STATE_CHANGED",
            json!({"old_state": "RECEIVED", "new_state": "PROCESSING", "trigger": "first_image_upload"}),
        )
        .decode();
        let EventKind::StateChanged(change) = decoded.kind else {
            panic!("expected state change");
        };
        assert_eq!(change.old_state, Some(StateRef::Known(SampleState::Received)));
        assert_eq!(change.new_state, Some(StateRef::Known(SampleState::Processing)));
        assert!(change.is_automatic());
        assert!(decoded.degraded.is_empty());
    }

    #[test]
    fn damaged_keeps_its_own_variant() {
        let decoded = event(
            "SAMPLE_DAMAGED",
            json!({"old_state": "PROCESSING", "new_state": "DAMAGED"}),
        )
        .decode();
        assert!(matches!(decoded.kind, EventKind::Damaged(_)));
        assert!(decoded.degraded.is_empty());
    }

    #[test]
    fn unrecognised_state_is_kept_verbatim() {
        let decoded = event(
            "SAMPLE_STATE_CHANGED",
            json!({"old_state": "EN_TRANSITO", "new_state": "RECEIVED"}),
        )
        .decode();
        let EventKind::StateChanged(change) = decoded.kind else {
            panic!("expected state change");
        };
        assert_eq!(change.old_state, Some(StateRef::Other("EN_TRANSITO".into())));
    }

    #[test]
    fn missing_filename_degrades() {
        let decoded = event("IMAGE_UPLOADED", json!({})).decode();
        assert_eq!(decoded.kind, EventKind::ImageUploaded(ImageRef { filename: None }));
        assert_eq!(decoded.degraded, vec!["filename"]);
    }

    #[test]
    fn mistyped_filename_degrades() {
        let decoded = event("IMAGE_DELETED", json!({"filename": 12})).decode();
        assert_eq!(decoded.kind, EventKind::ImageDeleted(ImageRef { filename: None }));
        assert!(decoded.is_degraded());
    }

    #[test]
    fn notes_variants() {
        let updated = event("SAMPLE_NOTES_UPDATED", json!({"new_notes": "Hemolizada"})).decode();
        assert_eq!(
            updated.kind,
            EventKind::NotesUpdated(NotesChange::Updated("Hemolizada".into()))
        );

        let blank = event("SAMPLE_NOTES_UPDATED", json!({"new_notes": "   "})).decode();
        assert_eq!(blank.kind, EventKind::NotesUpdated(NotesChange::Cleared));

        let null = event("SAMPLE_NOTES_UPDATED", json!({"new_notes": null})).decode();
        assert_eq!(null.kind, EventKind::NotesUpdated(NotesChange::Cleared));
        assert!(!null.is_degraded());

        let missing = event("SAMPLE_NOTES_UPDATED", json!({})).decode();
        assert_eq!(missing.kind, EventKind::NotesUpdated(NotesChange::Unspecified));
        assert_eq!(missing.degraded, vec!["new_notes"]);
    }

    #[test]
    fn assignee_list_skips_unreadable_items() {
        let decoded = event(
            "ASSIGNEES_ADDED",
            json!({"added": [{"name": "Ana"}, 42, "Luis", {"username": "nobody"}]}),
        )
        .decode();
        let EventKind::AssigneesAdded(change) = decoded.kind else {
            panic!("expected assignees");
        };
        let names: Vec<&str> = change.users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Luis"]);
        assert_eq!(decoded.degraded, vec!["added"]);
    }

    #[test]
    fn removed_assignees_read_removed_key() {
        let decoded = event("ASSIGNEES_REMOVED", json!({"removed": [{"name": "Luis"}]})).decode();
        let EventKind::AssigneesRemoved(change) = decoded.kind else {
            panic!("expected assignees");
        };
        assert_eq!(change.users.len(), 1);
        assert!(decoded.degraded.is_empty());
    }

    #[test]
    fn labels_decode_with_colors() {
        let decoded = event(
            "LABELS_ADDED",
            json!({"added": [{"name": "Urgente", "color": "#3b82f6"}]}),
        )
        .decode();
        assert_eq!(
            decoded.kind,
            EventKind::LabelsAdded(LabelChange {
                labels: vec![LabelChip {
                    name: "Urgente".into(),
                    color: Some("#3b82f6".into()),
                }],
            })
        );
    }

    #[test]
    fn non_object_metadata_degrades() {
        let decoded = event("LABELS_REMOVED", json!("oops")).decode();
        assert!(decoded.degraded.contains(&"metadata"));
        assert!(decoded.degraded.contains(&"removed"));
    }

    #[test]
    fn unknown_type_keeps_description() {
        let decoded = event("SAMPLE_PRINTED", json!({"printer": "zebra"})).decode();
        assert_eq!(
            decoded.kind,
            EventKind::Unknown {
                event_type: "SAMPLE_PRINTED".into(),
                description: "descripción del servidor".into(),
            }
        );
        assert!(!decoded.is_degraded());
    }

    #[test]
    fn handle_prefers_username() {
        let with_username = UserRef {
            name: "Luis Pérez".into(),
            username: Some("@lperez".into()),
            avatar: None,
        };
        assert_eq!(with_username.handle(), "lperez");

        let without = UserRef {
            name: "Ana  María".into(),
            username: None,
            avatar: None,
        };
        assert_eq!(without.handle(), "ana.maría");
    }

    #[test]
    fn self_detection_ignores_case_and_padding() {
        let ana = UserRef {
            name: " Ana ".into(),
            username: None,
            avatar: None,
        };
        assert!(ana.is_named("ana"));
        assert!(!ana.is_named(""));
        assert!(!ana.is_named("Anabel"));
    }
}
