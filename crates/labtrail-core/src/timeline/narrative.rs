//! Narrative text for timeline entries.
//!
//! A narrative is a short Spanish sentence fragment split into typed
//! segments. Styling belongs to whoever renders it; [`Narrative::plain_text`]
//! is the unstyled form.

use std::fmt;

use serde::Serialize;

use super::TimelineConfig;
use crate::event::{
    AssigneeChange, EventKind, ImageRef, LabelChange, NotesChange, StateChange, StateRef, UserRef,
};
use crate::lifecycle::StateDisplay;

/// Shown after an automatic transition.
pub const AUTOMATIC_NOTE: &str = " (automático al subir la primera imagen)";

/// Stand-in for a state missing from the metadata.
const UNKNOWN_STATE: &str = "desconocido";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Segment {
    Text(String),
    /// A value worth highlighting: a state name or a filename.
    Emphasis(String),
    Label {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    /// A user handle, without the leading `@`.
    Mention(String),
    /// Secondary remark appended to the sentence.
    Note(String),
}

impl Segment {
    fn write_plain(&self, out: &mut String) {
        match self {
            Self::Text(text) | Self::Emphasis(text) | Self::Note(text) => out.push_str(text),
            Self::Label { name, .. } => out.push_str(name),
            Self::Mention(handle) => {
                out.push('@');
                out.push_str(handle);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Narrative {
    pub segments: Vec<Segment>,
}

impl Narrative {
    fn text(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::Text(text.into()));
        self
    }

    fn emphasis(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::Emphasis(text.into()));
        self
    }

    fn note(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::Note(text.into()));
        self
    }

    fn separated<T>(mut self, items: &[T], segment: impl Fn(&T) -> Segment) -> Self {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.segments.push(Segment::Text(", ".to_string()));
            }
            self.segments.push(segment(item));
        }
        self
    }

    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            segment.write_plain(&mut out);
        }
        out
    }

    /// Handles mentioned in this narrative.
    pub fn mentions(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Mention(handle) => Some(handle.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Narrative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.plain_text())
    }
}

/// Build the narrative for a decoded event.
///
/// `actor_name` is the event's `created_by_name`, used to detect
/// self-assignment.
#[must_use]
pub fn narrate(kind: &EventKind, actor_name: Option<&str>, config: &TimelineConfig) -> Narrative {
    match kind {
        EventKind::StateChanged(change) | EventKind::Damaged(change) | EventKind::Cancelled(change) => {
            state_changed(change)
        }
        EventKind::ImageUploaded(image) => image_event("subió ", image, config),
        EventKind::ImageDeleted(image) => image_event("eliminó ", image, config),
        EventKind::NotesUpdated(NotesChange::Cleared) => {
            Narrative::default().text("eliminó la descripción")
        }
        EventKind::NotesUpdated(NotesChange::Updated(_) | NotesChange::Unspecified) => {
            Narrative::default().text("actualizó la descripción")
        }
        EventKind::AssigneesAdded(change) => assignees(change, actor_name, Direction::Added),
        EventKind::AssigneesRemoved(change) => assignees(change, actor_name, Direction::Removed),
        EventKind::LabelsAdded(change) => labels("agregó", change),
        EventKind::LabelsRemoved(change) => labels("quitó", change),
        EventKind::Unknown {
            event_type,
            description,
        } => {
            let text = if description.trim().is_empty() {
                event_type
            } else {
                description
            };
            Narrative::default().text(text.as_str())
        }
    }
}

fn state_name(state: Option<&StateRef>) -> String {
    match state {
        Some(StateRef::Known(state)) => StateDisplay::of(*state).label.to_string(),
        Some(StateRef::Other(raw)) => raw.clone(),
        None => UNKNOWN_STATE.to_string(),
    }
}

fn state_changed(change: &StateChange) -> Narrative {
    let narrative = Narrative::default()
        .text("cambió el estado: ")
        .emphasis(state_name(change.old_state.as_ref()))
        .text(" → ")
        .emphasis(state_name(change.new_state.as_ref()));
    if change.is_automatic() {
        narrative.note(AUTOMATIC_NOTE)
    } else {
        narrative
    }
}

fn image_event(verb: &str, image: &ImageRef, config: &TimelineConfig) -> Narrative {
    let filename = image
        .filename
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(&config.image_noun);
    Narrative::default().text(verb).emphasis(filename)
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Added,
    Removed,
}

fn assignees(change: &AssigneeChange, actor_name: Option<&str>, direction: Direction) -> Narrative {
    let is_self = |user: &UserRef| actor_name.is_some_and(|actor| user.is_named(actor));
    let includes_self = change.users.iter().any(is_self);
    let others: Vec<&UserRef> = change.users.iter().filter(|user| !is_self(*user)).collect();
    let mention = |user: &&UserRef| Segment::Mention(user.handle());

    let (reflexive, transitive, bare) = match direction {
        Direction::Added => ("Se asignó a sí mismo", "asignó a ", "asignó responsables"),
        Direction::Removed => ("Se desasignó a sí mismo", "desasignó a ", "desasignó responsables"),
    };

    match (includes_self, others.is_empty()) {
        (true, true) => Narrative::default().text(reflexive),
        (false, true) => Narrative::default().text(bare),
        (true, false) => Narrative::default()
            .text(format!("{reflexive} y a "))
            .separated(&others, mention),
        (false, _) => Narrative::default()
            .text(transitive)
            .separated(&others, mention),
    }
}

fn labels(verb: &str, change: &LabelChange) -> Narrative {
    let count = change.labels.len();
    if count == 0 {
        return Narrative::default().text(format!("{verb} etiquetas"));
    }
    let noun = if count == 1 { "etiqueta" } else { "etiquetas" };
    Narrative::default()
        .text(format!("{verb} {count} {noun}: "))
        .separated(&change.labels, |chip| Segment::Label {
            name: chip.name.clone(),
            color: chip.color.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LabelChip;
    use crate::model::SampleState;

    fn config() -> TimelineConfig {
        TimelineConfig::default()
    }

    fn user(name: &str) -> UserRef {
        UserRef {
            name: name.into(),
            username: None,
            avatar: None,
        }
    }

    fn added(users: Vec<UserRef>) -> EventKind {
        EventKind::AssigneesAdded(AssigneeChange { users })
    }

    #[test]
    fn self_assignment() {
        let narrative = narrate(&added(vec![user("Ana")]), Some("Ana"), &config());
        assert_eq!(narrative.plain_text(), "Se asignó a sí mismo");
    }

    #[test]
    fn self_and_others() {
        let narrative = narrate(
            &added(vec![user("Ana"), user("Luis")]),
            Some(" ana "),
            &config(),
        );
        assert_eq!(narrative.plain_text(), "Se asignó a sí mismo y a @luis");
        assert_eq!(narrative.mentions().collect::<Vec<_>>(), vec!["luis"]);
    }

    #[test]
    fn third_party_assignment_uses_handles() {
        let mut marta = user("Marta Ruiz");
        marta.username = Some("@mruiz".into());
        let narrative = narrate(&added(vec![user("Luis Gómez"), marta]), Some("Ana"), &config());
        assert_eq!(narrative.plain_text(), "asignó a @luis.gómez, @mruiz");
    }

    #[test]
    fn removal_wording() {
        let own = EventKind::AssigneesRemoved(AssigneeChange {
            users: vec![user("Ana")],
        });
        assert_eq!(
            narrate(&own, Some("Ana"), &config()).plain_text(),
            "Se desasignó a sí mismo"
        );
        let other = EventKind::AssigneesRemoved(AssigneeChange {
            users: vec![user("Luis")],
        });
        assert_eq!(narrate(&other, None, &config()).plain_text(), "desasignó a @luis");
    }

    #[test]
    fn empty_lists_fall_back_to_a_plain_phrase() {
        assert_eq!(
            narrate(&added(vec![]), Some("Ana"), &config()).plain_text(),
            "asignó responsables"
        );
        let removed = EventKind::AssigneesRemoved(AssigneeChange { users: vec![] });
        assert_eq!(
            narrate(&removed, None, &config()).plain_text(),
            "desasignó responsables"
        );
        let labels = EventKind::LabelsAdded(LabelChange { labels: vec![] });
        assert_eq!(narrate(&labels, None, &config()).plain_text(), "agregó etiquetas");
    }

    #[test]
    fn label_count_and_chips() {
        let one = EventKind::LabelsAdded(LabelChange {
            labels: vec![LabelChip {
                name: "Urgente".into(),
                color: Some("#ef4444".into()),
            }],
        });
        let narrative = narrate(&one, None, &config());
        assert_eq!(narrative.plain_text(), "agregó 1 etiqueta: Urgente");
        assert!(narrative.segments.contains(&Segment::Label {
            name: "Urgente".into(),
            color: Some("#ef4444".into()),
        }));

        let two = EventKind::LabelsRemoved(LabelChange {
            labels: vec![
                LabelChip { name: "A".into(), color: None },
                LabelChip { name: "B".into(), color: None },
            ],
        });
        assert_eq!(narrate(&two, None, &config()).plain_text(), "quitó 2 etiquetas: A, B");
    }

    #[test]
    fn automatic_transition_note() {
        let change = StateChange {
            old_state: Some(StateRef::Known(SampleState::Received)),
            new_state: Some(StateRef::Known(SampleState::Processing)),
            trigger: Some("first_image_upload".into()),
        };
        assert_eq!(
            narrate(&EventKind::StateChanged(change), None, &config()).plain_text(),
            "cambió el estado: Recibida → En proceso (automático al subir la primera imagen)"
        );
    }

    #[test]
    fn unknown_state_names_pass_through() {
        let change = StateChange {
            old_state: Some(StateRef::Other("EN_TRANSITO".into())),
            new_state: None,
            trigger: None,
        };
        assert_eq!(
            narrate(&EventKind::Cancelled(change), None, &config()).plain_text(),
            "cambió el estado: EN_TRANSITO → desconocido"
        );
    }

    #[test]
    fn image_without_filename_uses_noun() {
        let kind = EventKind::ImageDeleted(ImageRef { filename: None });
        assert_eq!(narrate(&kind, None, &config()).plain_text(), "eliminó imagen");
    }

    #[test]
    fn notes_wording() {
        let updated = EventKind::NotesUpdated(NotesChange::Updated("x".into()));
        let cleared = EventKind::NotesUpdated(NotesChange::Cleared);
        assert_eq!(narrate(&updated, None, &config()).plain_text(), "actualizó la descripción");
        assert_eq!(narrate(&cleared, None, &config()).plain_text(), "eliminó la descripción");
    }

    #[test]
    fn unknown_event_uses_description_then_type() {
        let described = EventKind::Unknown {
            event_type: "SAMPLE_PRINTED".into(),
            description: "Etiqueta impresa".into(),
        };
        assert_eq!(narrate(&described, None, &config()).plain_text(), "Etiqueta impresa");
        let bare = EventKind::Unknown {
            event_type: "SAMPLE_PRINTED".into(),
            description: String::new(),
        };
        assert_eq!(narrate(&bare, None, &config()).plain_text(), "SAMPLE_PRINTED");
    }
}
