//! In-process lab service.
//!
//! [`MemoryLab`] keeps samples, order labels, the label catalog, users,
//! images and events in memory and answers [`LabApi`] calls the way the REST
//! service does, including the domain events each mutation appends. State can
//! be seeded from and written back to a JSON [`Fixture`].

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::task::Poll;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{ApiError, ImageUpload, LabApi};
use crate::event::{DomainEvent, EventType, kind::FIRST_IMAGE_UPLOAD_TRIGGER};
use crate::lifecycle::expected_event;
use crate::model::{
    Assignee, EventId, Image, ImageId, ImageSet, Label, LabelAssignment, LabelId, Sample,
    SampleId, SampleState, UserId,
};

/// Serialized state of a [`MemoryLab`].
///
/// Maps are keyed by sample id (images, events) or order reference
/// (`order_labels`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    /// User recorded as `created_by` on events. `None` attributes every
    /// mutation to the system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<UserId>,
    #[serde(default)]
    pub users: Vec<Assignee>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub samples: Vec<Sample>,
    #[serde(default)]
    pub order_labels: BTreeMap<String, Vec<LabelAssignment>>,
    #[serde(default)]
    pub images: BTreeMap<String, Vec<Image>>,
    #[serde(default)]
    pub events: BTreeMap<String, Vec<DomainEvent>>,
    /// Timestamp of the last recorded event; each new event lands one minute
    /// later.
    #[serde(default)]
    pub clock: DateTime<Utc>,
    #[serde(default)]
    pub next_id: u64,
}

/// In-memory [`LabApi`] implementation.
#[derive(Debug, Default)]
pub struct MemoryLab {
    state: RefCell<Fixture>,
    calls: RefCell<Vec<String>>,
    reject_next: RefCell<Option<String>>,
    label_cap: Cell<Option<usize>>,
    yields: Cell<u32>,
}

impl MemoryLab {
    #[must_use]
    pub fn from_fixture(fixture: Fixture) -> Self {
        Self {
            state: RefCell::new(fixture),
            ..Self::default()
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn to_fixture(&self) -> Fixture {
        self.state.borrow().clone()
    }

    /// Load a fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid fixture.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        let fixture: Fixture = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))?;
        Ok(Self::from_fixture(fixture))
    }

    /// Write the current state back to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&*self.state.borrow())
            .context("Failed to serialize fixture")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write fixture {}", path.display()))
    }

    /// Refuse the next mutation with a 422 carrying `message`.
    pub fn reject_next(&self, message: impl Into<String>) {
        *self.reject_next.borrow_mut() = Some(message.into());
    }

    /// Persist at most `n` ids from each later label update while still
    /// answering success.
    pub fn cap_label_writes(&self, n: usize) {
        self.label_cap.set(Some(n));
    }

    /// Make every call yield to the executor `n` times before answering, so
    /// callers can interleave other work while a request is outstanding.
    pub fn set_latency(&self, n: u32) {
        self.yields.set(n);
    }

    /// Calls other than `GET`.
    #[must_use]
    pub fn mutations(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| !call.starts_with("GET "))
            .cloned()
            .collect()
    }

    /// Append an event directly, bypassing any mutation.
    pub fn push_event(&self, sample: &SampleId, event: DomainEvent) {
        self.state
            .borrow_mut()
            .events
            .entry(sample.to_string())
            .or_default()
            .push(event);
    }

    async fn enter(&self, method: &str, path: String) {
        debug!(%method, %path, "memory lab call");
        self.calls.borrow_mut().push(format!("{method} {path}"));
        for _ in 0..self.yields.get() {
            yield_once().await;
        }
    }

    fn check_rejection(&self) -> Result<(), ApiError> {
        match self.reject_next.borrow_mut().take() {
            Some(message) => Err(ApiError::Rejected {
                status: 422,
                message,
            }),
            None => Ok(()),
        }
    }
}

async fn yield_once() {
    let mut yielded = false;
    futures::future::poll_fn(|cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
    .await;
}

fn not_found(id: &SampleId) -> ApiError {
    ApiError::NotFound(format!("samples/{id}"))
}

fn rejected(status: u16, message: impl Into<String>) -> ApiError {
    ApiError::Rejected {
        status,
        message: message.into(),
    }
}

impl Fixture {
    fn sample_mut(&mut self, id: &SampleId) -> Result<&mut Sample, ApiError> {
        self.samples
            .iter_mut()
            .find(|sample| &sample.id == id)
            .ok_or_else(|| not_found(id))
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += TimeDelta::minutes(1);
        self.clock
    }

    fn user(&self, id: &UserId) -> Option<&Assignee> {
        self.users.iter().find(|user| &user.id == id)
    }

    fn record(
        &mut self,
        sample: &SampleId,
        event_type: EventType,
        description: &str,
        metadata: serde_json::Value,
        by_system: bool,
    ) {
        let actor = if by_system {
            None
        } else {
            self.actor.as_ref().and_then(|id| self.user(id)).cloned()
        };
        let id = EventId::new(self.fresh_id("evt"));
        let created_at = self.tick();
        let event = DomainEvent {
            id,
            event_type: event_type.as_str().to_string(),
            description: description.to_string(),
            metadata,
            created_by: actor.as_ref().map(|user| user.id.clone()),
            created_by_name: actor.as_ref().map(|user| user.name.clone()),
            created_by_avatar: actor.and_then(|user| user.avatar_url),
            created_at,
        };
        self.events.entry(sample.to_string()).or_default().push(event);
    }
}

fn dedup<T: Clone + Eq + std::hash::Hash>(items: &[T]) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}

impl LabApi for MemoryLab {
    async fn sample(&self, id: &SampleId) -> Result<Sample, ApiError> {
        self.enter("GET", format!("samples/{id}")).await;
        let state = self.state.borrow();
        let mut sample = state
            .samples
            .iter()
            .find(|sample| &sample.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))?;
        sample.order_labels = sample
            .order_ref
            .as_ref()
            .and_then(|order| state.order_labels.get(order))
            .cloned()
            .unwrap_or_default();
        Ok(sample)
    }

    async fn sample_images(&self, id: &SampleId) -> Result<ImageSet, ApiError> {
        self.enter("GET", format!("samples/{id}/images")).await;
        let state = self.state.borrow();
        if !state.samples.iter().any(|sample| &sample.id == id) {
            return Err(not_found(id));
        }
        Ok(ImageSet {
            images: state.images.get(id.as_str()).cloned().unwrap_or_default(),
        })
    }

    async fn sample_events(&self, id: &SampleId) -> Result<Vec<DomainEvent>, ApiError> {
        self.enter("GET", format!("samples/{id}/events")).await;
        let state = self.state.borrow();
        if !state.samples.iter().any(|sample| &sample.id == id) {
            return Err(not_found(id));
        }
        let mut events = state.events.get(id.as_str()).cloned().unwrap_or_default();
        events.sort_by_key(|event| event.created_at);
        Ok(events)
    }

    async fn set_sample_state(&self, id: &SampleId, target: SampleState) -> Result<(), ApiError> {
        self.enter("PATCH", format!("samples/{id}/state")).await;
        self.check_rejection()?;
        let mut state = self.state.borrow_mut();
        let sample = state.sample_mut(id)?;
        let current = sample.state;
        if current == target {
            return Err(rejected(409, format!("sample is already {target}")));
        }
        if current.is_terminal() {
            return Err(rejected(409, format!("sample is {current} and cannot change")));
        }
        sample.state = target;
        state.record(
            id,
            expected_event(target),
            &format!("Estado cambiado de {current} a {target}"),
            json!({"old_state": current, "new_state": target}),
            false,
        );
        Ok(())
    }

    async fn set_sample_notes(&self, id: &SampleId, notes: Option<&str>) -> Result<(), ApiError> {
        self.enter("PATCH", format!("samples/{id}/notes")).await;
        self.check_rejection()?;
        let notes = notes.map(str::trim).filter(|text| !text.is_empty());
        let mut state = self.state.borrow_mut();
        state.sample_mut(id)?.notes = notes.map(str::to_string);
        state.record(
            id,
            EventType::SampleNotesUpdated,
            "Descripción actualizada",
            json!({"new_notes": notes}),
            false,
        );
        Ok(())
    }

    async fn set_sample_assignees(
        &self,
        id: &SampleId,
        user_ids: &[UserId],
    ) -> Result<(), ApiError> {
        self.enter("PUT", format!("samples/{id}/assignees")).await;
        self.check_rejection()?;
        let mut state = self.state.borrow_mut();

        let mut next = Vec::new();
        for user_id in dedup(user_ids) {
            let user = state
                .user(&user_id)
                .cloned()
                .ok_or_else(|| rejected(422, format!("unknown user {user_id}")))?;
            next.push(user);
        }

        let sample = state.sample_mut(id)?;
        let previous = std::mem::replace(&mut sample.assignees, next.clone());
        let before: HashSet<&UserId> = previous.iter().map(|user| &user.id).collect();
        let after: HashSet<&UserId> = next.iter().map(|user| &user.id).collect();
        let as_ref = |user: &Assignee| json!({"name": user.name, "avatar": user.avatar_url});
        let added: Vec<_> = next
            .iter()
            .filter(|user| !before.contains(&user.id))
            .map(as_ref)
            .collect();
        let removed: Vec<_> = previous
            .iter()
            .filter(|user| !after.contains(&user.id))
            .map(as_ref)
            .collect();

        if !added.is_empty() {
            state.record(
                id,
                EventType::AssigneesAdded,
                "Responsables agregados",
                json!({"added": added}),
                false,
            );
        }
        if !removed.is_empty() {
            state.record(
                id,
                EventType::AssigneesRemoved,
                "Responsables quitados",
                json!({"removed": removed}),
                false,
            );
        }
        Ok(())
    }

    async fn set_sample_labels(&self, id: &SampleId, label_ids: &[LabelId]) -> Result<(), ApiError> {
        self.enter("PUT", format!("samples/{id}/labels")).await;
        self.check_rejection()?;
        let mut state = self.state.borrow_mut();

        let mut requested = dedup(label_ids);
        if let Some(cap) = self.label_cap.get() {
            requested.truncate(cap);
        }
        let mut next = Vec::new();
        for label_id in requested {
            let label = state
                .labels
                .iter()
                .find(|label| label.id == label_id)
                .ok_or_else(|| rejected(422, format!("unknown label {label_id}")))?;
            next.push(LabelAssignment::from(label));
        }

        let sample = state.sample_mut(id)?;
        let previous = std::mem::replace(&mut sample.labels, next.clone());
        let before: HashSet<&LabelId> = previous.iter().map(|a| &a.label_id).collect();
        let after: HashSet<&LabelId> = next.iter().map(|a| &a.label_id).collect();
        let chip = |a: &LabelAssignment| json!({"name": a.name, "color": a.color});
        let added: Vec<_> = next
            .iter()
            .filter(|a| !before.contains(&a.label_id))
            .map(chip)
            .collect();
        let removed: Vec<_> = previous
            .iter()
            .filter(|a| !after.contains(&a.label_id))
            .map(chip)
            .collect();

        if !added.is_empty() {
            state.record(
                id,
                EventType::LabelsAdded,
                "Etiquetas agregadas",
                json!({"added": added}),
                false,
            );
        }
        if !removed.is_empty() {
            state.record(
                id,
                EventType::LabelsRemoved,
                "Etiquetas quitadas",
                json!({"removed": removed}),
                false,
            );
        }
        Ok(())
    }

    async fn upload_sample_image(
        &self,
        id: &SampleId,
        upload: &ImageUpload,
    ) -> Result<Image, ApiError> {
        self.enter("POST", format!("samples/{id}/images")).await;
        self.check_rejection()?;
        let mut state = self.state.borrow_mut();
        let current = state.sample_mut(id)?.state;

        let image = Image {
            id: ImageId::new(state.fresh_id("img")),
            filename: upload.filename.clone(),
            url: None,
            content_type: Some(upload.content_type.clone()),
            uploaded_at: Some(state.clock + TimeDelta::minutes(1)),
        };
        let images = state.images.entry(id.to_string()).or_default();
        let first = images.is_empty();
        images.push(image.clone());

        state.record(
            id,
            EventType::ImageUploaded,
            &format!("Imagen {} subida", upload.filename),
            json!({"filename": upload.filename}),
            false,
        );

        if first && current == SampleState::Received {
            state.sample_mut(id)?.state = SampleState::Processing;
            state.record(
                id,
                EventType::SampleStateChanged,
                "Estado cambiado automáticamente al subir la primera imagen",
                json!({
                    "old_state": SampleState::Received,
                    "new_state": SampleState::Processing,
                    "trigger": FIRST_IMAGE_UPLOAD_TRIGGER,
                }),
                true,
            );
        }
        Ok(image)
    }

    async fn delete_sample_image(&self, id: &SampleId, image_id: &ImageId) -> Result<(), ApiError> {
        self.enter("DELETE", format!("samples/{id}/images/{image_id}"))
            .await;
        self.check_rejection()?;
        let mut state = self.state.borrow_mut();
        state.sample_mut(id)?;
        let images = state.images.entry(id.to_string()).or_default();
        let position = images
            .iter()
            .position(|image| &image.id == image_id)
            .ok_or_else(|| ApiError::NotFound(format!("samples/{id}/images/{image_id}")))?;
        let removed = images.remove(position);
        state.record(
            id,
            EventType::ImageDeleted,
            &format!("Imagen {} eliminada", removed.filename),
            json!({"filename": removed.filename}),
            false,
        );
        Ok(())
    }

    async fn label_catalog(&self) -> Result<Vec<Label>, ApiError> {
        self.enter("GET", "labels".to_string()).await;
        Ok(self.state.borrow().labels.clone())
    }

    async fn create_label(&self, name: &str, color: &str) -> Result<Label, ApiError> {
        self.enter("POST", "labels".to_string()).await;
        self.check_rejection()?;
        let mut state = self.state.borrow_mut();
        let taken = state
            .labels
            .iter()
            .any(|label| label.name.trim().to_lowercase() == name.trim().to_lowercase());
        if taken {
            return Err(rejected(409, format!("label '{name}' already exists")));
        }
        let label = Label {
            id: LabelId::new(state.fresh_id("lbl")),
            name: name.trim().to_string(),
            color: color.to_string(),
        };
        state.labels.push(label.clone());
        Ok(label)
    }

    async fn lab_users(&self) -> Result<Vec<Assignee>, ApiError> {
        self.enter("GET", "users/lab".to_string()).await;
        Ok(self.state.borrow().users.clone())
    }
}

fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}

fn user(id: &str, name: &str, email: &str) -> Assignee {
    Assignee {
        id: UserId::new(id),
        name: name.to_string(),
        email: email.to_string(),
        avatar_url: None,
    }
}

fn label(id: &str, name: &str, color: &str) -> Label {
    Label {
        id: LabelId::new(id),
        name: name.to_string(),
        color: color.to_string(),
    }
}

impl MemoryLab {
    /// A small lab with three samples sharing one order.
    ///
    /// - `s-100`: RECEIVED, own label "Repetir", inherits "Convenio" from
    ///   order `ord-7`, no images, no events.
    /// - `s-101`: PROCESSING with one image and a short history.
    /// - `s-102`: READY.
    ///
    /// Mutations are attributed to `u-ana` ("Ana Torres").
    #[must_use]
    pub fn demo() -> Self {
        // 2026-03-02T08:00:00Z
        let base = 1_772_438_400;
        let ana = user("u-ana", "Ana Torres", "ana@lab.example");
        let luis = user("u-luis", "Luis Gómez", "luis@lab.example");
        let marta = user("u-marta", "Marta Ruiz", "marta@lab.example");

        let labels = vec![
            label("lbl-1", "Urgente", "#ef4444"),
            label("lbl-2", "Convenio", "#3b82f6"),
            label("lbl-3", "Repetir", "#f59e0b"),
            label("lbl-4", "Control de calidad", "#10b981"),
        ];

        let sample = |id: &str, code: &str, state: SampleState| Sample {
            id: SampleId::new(id),
            code: code.to_string(),
            sample_type: "Sangre".to_string(),
            state,
            notes: None,
            order_ref: Some("ord-7".to_string()),
            branch_ref: Some("Sucursal Centro".to_string()),
            patient_ref: Some("pac-31".to_string()),
            collected_at: Some(at(base)),
            received_at: Some(at(base + 1800)),
            labels: Vec::new(),
            order_labels: Vec::new(),
            assignees: Vec::new(),
        };

        let mut s100 = sample("s-100", "M-2026-0100", SampleState::Received);
        s100.labels = vec![LabelAssignment::from(&labels[2])];
        s100.assignees = vec![ana.clone()];

        let mut s101 = sample("s-101", "M-2026-0101", SampleState::Processing);
        s101.notes = Some("Hemólisis leve".to_string());
        s101.assignees = vec![ana.clone(), luis.clone()];

        let s102 = sample("s-102", "M-2026-0102", SampleState::Ready);

        let event = |id: &str, event_type: EventType, metadata, by: Option<&Assignee>, offset| {
            DomainEvent {
                id: EventId::new(id),
                event_type: event_type.as_str().to_string(),
                description: String::new(),
                metadata,
                created_by: by.map(|user| user.id.clone()),
                created_by_name: by.map(|user| user.name.clone()),
                created_by_avatar: None,
                created_at: at(base + offset),
            }
        };

        let history = vec![
            event(
                "evt-1",
                EventType::AssigneesAdded,
                json!({"added": [{"name": "Ana Torres"}, {"name": "Luis Gómez"}]}),
                Some(&ana),
                3600,
            ),
            event(
                "evt-2",
                EventType::ImageUploaded,
                json!({"filename": "frotis.jpg"}),
                Some(&ana),
                3660,
            ),
            event(
                "evt-3",
                EventType::SampleStateChanged,
                json!({"old_state": "RECEIVED", "new_state": "PROCESSING", "trigger": FIRST_IMAGE_UPLOAD_TRIGGER}),
                None,
                3661,
            ),
            event(
                "evt-4",
                EventType::SampleNotesUpdated,
                json!({"new_notes": "Hemólisis leve"}),
                Some(&luis),
                5400,
            ),
        ];

        let fixture = Fixture {
            actor: Some(ana.id.clone()),
            users: vec![ana, luis, marta],
            order_labels: BTreeMap::from([(
                "ord-7".to_string(),
                vec![LabelAssignment::from(&labels[1])],
            )]),
            labels,
            samples: vec![s100, s101, s102],
            images: BTreeMap::from([(
                "s-101".to_string(),
                vec![Image {
                    id: ImageId::new("img-1"),
                    filename: "frotis.jpg".to_string(),
                    url: None,
                    content_type: Some("image/jpeg".to_string()),
                    uploaded_at: Some(at(base + 3660)),
                }],
            )]),
            events: BTreeMap::from([("s-101".to_string(), history)]),
            clock: at(base + 7200),
            next_id: 100,
        };
        Self::from_fixture(fixture)
    }
}
