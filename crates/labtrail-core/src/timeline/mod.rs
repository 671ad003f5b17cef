//! Activity timeline projected from a sample's domain events.
//!
//! The builder is a pure function of its input: events in ascending
//! `created_at` order plus the sample detail. Every event yields exactly one
//! entry; nothing is dropped, merged or reordered. Consecutive events by the
//! same actor are marked as continuations so the renderer can show a single
//! header for the run.

pub mod narrative;

pub use narrative::{Narrative, Segment, narrate};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::event::DomainEvent;
use crate::model::{EventId, Sample, UserId};

/// Actor shown when an event has no `created_by_name`.
pub const SYSTEM_ACTOR: &str = "Sistema";

/// Noun used when an image event carries no filename.
pub const IMAGE_NOUN: &str = "imagen";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineConfig {
    pub system_actor: String,
    pub image_noun: String,
    /// Mark same-actor runs as continuations. When off, every entry gets its
    /// own header.
    pub collapse_same_actor: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            system_actor: SYSTEM_ACTOR.to_string(),
            image_noun: IMAGE_NOUN.to_string(),
            collapse_same_actor: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// No user recorded on the event.
    pub system: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    /// `None` for entries synthesized from sample timestamps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EventId>,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<Actor>,
    /// Same actor as the previous entry; render without a header.
    pub continuation: bool,
    pub narrative: Narrative,
    /// Metadata fields that fell back to defaults.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<&'static str>,
}

impl TimelineEntry {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    /// Built from `collected_at` / `received_at` because the event list was
    /// empty.
    pub synthetic: bool,
}

/// Entries sharing a calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayGroup<'a> {
    pub day: NaiveDate,
    pub entries: Vec<&'a TimelineEntry>,
}

impl Timeline {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries with degraded metadata.
    #[must_use]
    pub fn degraded_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_degraded()).count()
    }

    /// Group consecutive entries by day, preserving order.
    #[must_use]
    pub fn by_day(&self) -> Vec<DayGroup<'_>> {
        let mut groups: Vec<DayGroup<'_>> = Vec::new();
        for entry in &self.entries {
            let day = entry.at.date_naive();
            match groups.last_mut() {
                Some(group) if group.day == day => group.entries.push(entry),
                _ => groups.push(DayGroup {
                    day,
                    entries: vec![entry],
                }),
            }
        }
        groups
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    config: TimelineConfig,
}

impl TimelineBuilder {
    #[must_use]
    pub const fn new(config: TimelineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Project `events` into a timeline, falling back to the sample's
    /// collection and reception timestamps when there are no events.
    #[must_use]
    pub fn build(&self, events: &[DomainEvent], sample: &Sample) -> Timeline {
        if events.is_empty() {
            return self.fallback(sample);
        }

        let mut entries = Vec::with_capacity(events.len());
        let mut previous: Option<&Option<UserId>> = None;
        for event in events {
            let continuation = self.config.collapse_same_actor
                && previous.is_some_and(|prev| *prev == event.created_by);
            previous = Some(&event.created_by);
            entries.push(self.entry(event, continuation));
        }

        let timeline = Timeline {
            entries,
            synthetic: false,
        };
        let degraded = timeline.degraded_count();
        if degraded > 0 {
            debug!(sample = %sample.id, degraded, "timeline built with degraded entries");
        }
        timeline
    }

    fn entry(&self, event: &DomainEvent, continuation: bool) -> TimelineEntry {
        let decoded = event.decode();
        let actor_name = event.created_by_name.as_deref();
        let narrative = narrate(&decoded.kind, actor_name, &self.config);
        let actor = Actor {
            name: actor_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(&self.config.system_actor)
                .to_string(),
            avatar: event.created_by_avatar.clone(),
            system: event.created_by.is_none() && actor_name.is_none(),
        };
        TimelineEntry {
            id: Some(event.id.clone()),
            at: event.created_at,
            event_type: Some(event.event_type.clone()),
            actor: Some(actor),
            continuation,
            narrative,
            degraded: decoded.degraded,
        }
    }

    fn fallback(&self, sample: &Sample) -> Timeline {
        let mut entries: Vec<TimelineEntry> = [
            (sample.collected_at, "Muestra recolectada"),
            (sample.received_at, "Muestra recibida en el laboratorio"),
        ]
        .into_iter()
        .filter_map(|(at, text)| {
            at.map(|at| TimelineEntry {
                id: None,
                at,
                event_type: None,
                actor: None,
                continuation: false,
                narrative: Narrative {
                    segments: vec![Segment::Text(text.to_string())],
                },
                degraded: Vec::new(),
            })
        })
        .collect();
        entries.sort_by_key(|entry| entry.at);
        Timeline {
            entries,
            synthetic: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SampleId, SampleState};
    use serde_json::{Value, json};

    fn sample() -> Sample {
        Sample {
            id: SampleId::new("s-1"),
            code: "M-1".into(),
            sample_type: "Sangre".into(),
            state: SampleState::Received,
            notes: None,
            order_ref: None,
            branch_ref: None,
            patient_ref: None,
            collected_at: None,
            received_at: None,
            labels: Vec::new(),
            order_labels: Vec::new(),
            assignees: Vec::new(),
        }
    }

    fn event(id: &str, event_type: &str, metadata: Value, by: Option<(&str, &str)>, minute: u32) -> DomainEvent {
        DomainEvent {
            id: EventId::new(id),
            event_type: event_type.into(),
            description: String::new(),
            metadata,
            created_by: by.map(|(id, _)| UserId::new(id)),
            created_by_name: by.map(|(_, name)| name.to_string()),
            created_by_avatar: None,
            created_at: format!("2026-03-02T10:{minute:02}:00Z")
                .parse()
                .expect("timestamp"),
        }
    }

    const ANA: Option<(&str, &str)> = Some(("u1", "Ana"));
    const LUIS: Option<(&str, &str)> = Some(("u2", "Luis"));

    #[test]
    fn one_entry_per_event_in_order() {
        let events = vec![
            event("e1", "IMAGE_UPLOADED", json!({"filename": "a.jpg"}), ANA, 1),
            event("e2", "SAMPLE_PRINTED", json!(null), LUIS, 2),
            event("e3", "LABELS_ADDED", json!({"added": [{"name": "Urgente"}]}), ANA, 3),
        ];
        let timeline = TimelineBuilder::default().build(&events, &sample());
        assert!(!timeline.synthetic);
        let ids: Vec<_> = timeline
            .entries
            .iter()
            .map(|entry| entry.id.as_ref().map(EventId::as_str))
            .collect();
        assert_eq!(ids, vec![Some("e1"), Some("e2"), Some("e3")]);
        assert_eq!(timeline.entries[1].narrative.plain_text(), "SAMPLE_PRINTED");
        assert!(timeline.entries[2].narrative.plain_text().contains("1 etiqueta"));
    }

    #[test]
    fn same_actor_run_is_a_continuation() {
        let events = vec![
            event("e1", "IMAGE_UPLOADED", json!({"filename": "a.jpg"}), ANA, 1),
            event("e2", "IMAGE_UPLOADED", json!({"filename": "b.jpg"}), ANA, 2),
            event("e3", "IMAGE_DELETED", json!({"filename": "a.jpg"}), LUIS, 3),
        ];
        let timeline = TimelineBuilder::default().build(&events, &sample());
        let flags: Vec<_> = timeline.entries.iter().map(|e| e.continuation).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert_eq!(timeline.entries[1].narrative.plain_text(), "subió b.jpg");
        assert_ne!(timeline.entries[0].at, timeline.entries[1].at);
    }

    #[test]
    fn system_events_collapse_with_each_other() {
        let events = vec![
            event("e1", "SAMPLE_STATE_CHANGED", json!({}), None, 1),
            event("e2", "SAMPLE_STATE_CHANGED", json!({}), None, 2),
        ];
        let timeline = TimelineBuilder::default().build(&events, &sample());
        let actor = timeline.entries[0].actor.as_ref().expect("actor");
        assert_eq!(actor.name, "Sistema");
        assert!(actor.system);
        assert!(timeline.entries[1].continuation);
    }

    #[test]
    fn collapsing_can_be_disabled() {
        let builder = TimelineBuilder::new(TimelineConfig {
            collapse_same_actor: false,
            ..TimelineConfig::default()
        });
        let events = vec![
            event("e1", "IMAGE_UPLOADED", json!({"filename": "a.jpg"}), ANA, 1),
            event("e2", "IMAGE_UPLOADED", json!({"filename": "b.jpg"}), ANA, 2),
        ];
        let timeline = builder.build(&events, &sample());
        assert!(timeline.entries.iter().all(|entry| !entry.continuation));
    }

    #[test]
    fn custom_system_actor() {
        let builder = TimelineBuilder::new(TimelineConfig {
            system_actor: "LIMS".into(),
            ..TimelineConfig::default()
        });
        let events = vec![event("e1", "IMAGE_UPLOADED", json!({}), None, 1)];
        let timeline = builder.build(&events, &sample());
        let entry = &timeline.entries[0];
        assert_eq!(entry.actor.as_ref().map(|a| a.name.as_str()), Some("LIMS"));
        assert_eq!(entry.narrative.plain_text(), "subió imagen");
        assert_eq!(entry.degraded, vec!["filename"]);
        assert_eq!(timeline.degraded_count(), 1);
    }

    #[test]
    fn empty_events_fall_back_to_sample_timestamps() {
        let mut sample = sample();
        sample.received_at = Some("2026-03-02T09:00:00Z".parse().expect("ts"));
        sample.collected_at = Some("2026-03-01T18:00:00Z".parse().expect("ts"));

        let timeline = TimelineBuilder::default().build(&[], &sample);
        assert!(timeline.synthetic);
        let texts: Vec<_> = timeline
            .entries
            .iter()
            .map(|entry| entry.narrative.plain_text())
            .collect();
        assert_eq!(
            texts,
            vec!["Muestra recolectada", "Muestra recibida en el laboratorio"]
        );
        assert!(timeline.entries.iter().all(|entry| entry.actor.is_none()));
    }

    #[test]
    fn fallback_is_chronological_and_skips_missing_timestamps() {
        let mut sample = sample();
        sample.collected_at = Some("2026-03-03T08:00:00Z".parse().expect("ts"));
        sample.received_at = Some("2026-03-02T08:00:00Z".parse().expect("ts"));
        let timeline = TimelineBuilder::default().build(&[], &sample);
        assert_eq!(
            timeline.entries[0].narrative.plain_text(),
            "Muestra recibida en el laboratorio"
        );

        let timeline = TimelineBuilder::default().build(&[], &self::sample());
        assert!(timeline.is_empty());
        assert!(timeline.synthetic);
    }

    #[test]
    fn groups_by_day() {
        let mut late = event("e3", "IMAGE_DELETED", json!({"filename": "a"}), ANA, 3);
        late.created_at = "2026-03-03T07:00:00Z".parse().expect("ts");
        let events = vec![
            event("e1", "IMAGE_UPLOADED", json!({"filename": "a"}), ANA, 1),
            event("e2", "IMAGE_UPLOADED", json!({"filename": "b"}), ANA, 2),
            late,
        ];
        let timeline = TimelineBuilder::default().build(&events, &sample());
        let groups = timeline.by_day();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].entries.len(), 2);
        assert_eq!(groups[1].day.to_string(), "2026-03-03");
    }
}
