//! Editing session for one sample.
//!
//! [`SampleWorkspace`] owns the last-known-good view of a sample (detail,
//! images, events, resolved labels, timeline) and routes every edit through
//! the components of this crate. It never applies a change optimistically:
//! after each accepted mutation it re-fetches sample, images and events and
//! rebuilds the derived view. On failure the previous view stays as it was
//! and a [`Notice`] is queued.
//!
//! The workspace is single-threaded (`Cell`/`RefCell`, `!Sync`) and holds no
//! borrow across an `.await`.

use std::cell::{Cell, RefCell};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{ImageUpload, LabApi};
use crate::assignees::{AssigneeDelta, AssigneeSetReconciler};
use crate::error::{ErrorCode, LabError};
use crate::event::DomainEvent;
use crate::inflight::InFlight;
use crate::labels::{LabelCatalog, ResolvedLabel, apply_label_selection, resolve_labels};
use crate::lifecycle::{SampleStateMachine, StateDisplay, Transition};
use crate::model::{Assignee, Image, ImageId, ImageSet, Label, LabelId, Sample, SampleId, SampleState, UserId};
use crate::timeline::{Timeline, TimelineBuilder, TimelineConfig};

/// Editing surfaces that allow one outstanding submission each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Labels,
    Assignees,
    Notes,
    Catalog,
}

impl Surface {
    const fn describe(self) -> &'static str {
        match self {
            Self::Labels => "label update",
            Self::Assignees => "assignee update",
            Self::Notes => "notes update",
            Self::Catalog => "label creation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing report of something that did not go as asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub code: String,
    pub message: String,
}

impl Notice {
    fn from_error(err: &LabError) -> Self {
        let level = match err {
            LabError::ValidationRejected { .. } | LabError::TransitionInProgress { .. } => {
                NoticeLevel::Warning
            }
            _ => NoticeLevel::Error,
        };
        Self {
            level,
            code: err.code().code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Everything displayed for a loaded sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleView {
    pub sample: Sample,
    pub images: ImageSet,
    pub events: Vec<DomainEvent>,
    pub labels: Vec<ResolvedLabel>,
    pub timeline: Timeline,
    pub state: StateDisplay,
    pub offered: Vec<SampleState>,
}

pub struct SampleWorkspace<A: LabApi> {
    api: A,
    sample_id: SampleId,
    builder: TimelineBuilder,
    machine: SampleStateMachine,
    view: RefCell<Option<SampleView>>,
    catalog: RefCell<LabelCatalog>,
    users: RefCell<Vec<Assignee>>,
    surfaces: InFlight<Surface>,
    uploads: InFlight<String>,
    deletions: InFlight<ImageId>,
    generation: Cell<u64>,
    notices: RefCell<Vec<Notice>>,
}

impl<A: LabApi> SampleWorkspace<A> {
    pub fn new(api: A, sample_id: SampleId, timeline: TimelineConfig) -> Self {
        Self {
            api,
            sample_id,
            builder: TimelineBuilder::new(timeline),
            machine: SampleStateMachine::new(),
            view: RefCell::new(None),
            catalog: RefCell::new(LabelCatalog::default()),
            users: RefCell::new(Vec::new()),
            surfaces: InFlight::new(),
            uploads: InFlight::new(),
            deletions: InFlight::new(),
            generation: Cell::new(0),
            notices: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Release the collaborator, e.g. to persist an in-memory service.
    #[must_use]
    pub fn into_api(self) -> A {
        self.api
    }

    #[must_use]
    pub const fn sample_id(&self) -> &SampleId {
        &self.sample_id
    }

    /// Current view, if loaded.
    #[must_use]
    pub fn snapshot(&self) -> Option<SampleView> {
        self.view.borrow().clone()
    }

    #[must_use]
    pub fn catalog(&self) -> LabelCatalog {
        self.catalog.borrow().clone()
    }

    #[must_use]
    pub fn users(&self) -> Vec<Assignee> {
        self.users.borrow().clone()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    #[must_use]
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.borrow_mut())
    }

    #[must_use]
    pub fn is_busy(&self, surface: Surface) -> bool {
        self.surfaces.is_pending(&surface)
    }

    #[must_use]
    pub fn is_transition_pending(&self) -> bool {
        self.machine.is_pending(&self.sample_id)
    }

    #[must_use]
    pub fn is_uploading(&self, filename: &str) -> bool {
        self.uploads.is_pending(&filename.to_string())
    }

    /// Close the view. Responses to requests issued before this call are
    /// discarded with [`LabError::Detached`].
    pub fn teardown(&self) {
        self.generation.set(self.generation.get() + 1);
        self.view.borrow_mut().take();
        self.notices.borrow_mut().clear();
        debug!(sample = %self.sample_id, "workspace torn down");
    }

    /// Fetch sample, images and events and rebuild the view.
    ///
    /// # Errors
    ///
    /// [`LabError::Request`] if any read fails (the previous view is kept),
    /// [`LabError::Detached`] after teardown.
    pub async fn load(&self) -> Result<(), LabError> {
        let result = self.refresh(self.generation.get()).await;
        self.report(result)
    }

    /// Fetch the label catalog and the lab users.
    ///
    /// # Errors
    ///
    /// [`LabError::Request`] if either read fails.
    pub async fn load_reference_data(&self) -> Result<(), LabError> {
        let generation = self.generation.get();
        let result = futures::try_join!(LabelCatalog::load(&self.api), async {
            self.api.lab_users().await.map_err(LabError::from)
        });
        let (catalog, users) = self.report(result)?;
        self.ensure_current(generation)?;

        *self.catalog.borrow_mut() = catalog;
        *self.users.borrow_mut() = users;
        self.relabel();
        Ok(())
    }

    /// Submit a label selection. Inherited ids in `selected` are ignored.
    /// The view is re-fetched even when the read-back does not match.
    ///
    /// # Errors
    ///
    /// [`LabError::NotLoaded`], [`LabError::TransitionInProgress`],
    /// [`LabError::UpdateRejected`], [`LabError::Request`],
    /// [`LabError::Detached`].
    pub async fn apply_labels(&self, selected: &[LabelId]) -> Result<Vec<LabelId>, LabError> {
        let result = self.apply_labels_inner(selected).await;
        self.report(result)
    }

    async fn apply_labels_inner(&self, selected: &[LabelId]) -> Result<Vec<LabelId>, LabError> {
        let resolved = self.loaded()?.labels;
        let Some(_guard) = self.surfaces.try_begin(Surface::Labels) else {
            return Err(LabError::in_progress(Surface::Labels.describe()));
        };
        let generation = self.generation.get();

        let submitted = apply_label_selection(&self.api, &self.sample_id, &resolved, selected).await;
        self.ensure_current(generation)?;
        match submitted {
            Ok(submitted) => {
                self.refresh_after_mutation(generation).await?;
                Ok(submitted)
            }
            // A read-back mismatch means the service wrote something.
            Err(err @ LabError::UpdateRejected { .. }) => {
                self.refresh_after_mutation(generation).await?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Replace the sample's assignees with `selection`.
    ///
    /// # Errors
    ///
    /// As [`Self::apply_labels`].
    pub async fn apply_assignees(&self, selection: &[UserId]) -> Result<AssigneeDelta, LabError> {
        let result = self.apply_assignees_inner(selection).await;
        self.report(result)
    }

    async fn apply_assignees_inner(&self, selection: &[UserId]) -> Result<AssigneeDelta, LabError> {
        let mut reconciler = AssigneeSetReconciler::from_sample(&self.loaded()?.sample);
        let Some(_guard) = self.surfaces.try_begin(Surface::Assignees) else {
            return Err(LabError::in_progress(Surface::Assignees.describe()));
        };
        let generation = self.generation.get();

        let delta = reconciler.apply(&self.api, &self.sample_id, selection).await;
        self.ensure_current(generation)?;
        let delta = delta?;
        if !delta.is_empty() {
            self.refresh_after_mutation(generation).await?;
        }
        Ok(delta)
    }

    /// Move the sample to `target`.
    ///
    /// # Errors
    ///
    /// [`LabError::ValidationRejected`] for the current state, plus the
    /// errors of [`Self::apply_labels`].
    pub async fn request_transition(&self, target: SampleState) -> Result<Transition, LabError> {
        let result = self.request_transition_inner(target).await;
        self.report(result)
    }

    async fn request_transition_inner(&self, target: SampleState) -> Result<Transition, LabError> {
        let sample = self.loaded()?.sample;
        let generation = self.generation.get();

        let transition = self.machine.request_transition(&self.api, &sample, target).await;
        self.ensure_current(generation)?;
        let transition = transition?;
        self.refresh_after_mutation(generation).await?;
        Ok(transition)
    }

    /// Replace the notes. Blank text clears them. Unchanged notes are not
    /// submitted.
    ///
    /// # Errors
    ///
    /// As [`Self::apply_labels`].
    pub async fn update_notes(&self, notes: Option<&str>) -> Result<bool, LabError> {
        let result = self.update_notes_inner(notes).await;
        self.report(result)
    }

    async fn update_notes_inner(&self, notes: Option<&str>) -> Result<bool, LabError> {
        let notes = notes.map(str::trim).filter(|text| !text.is_empty());
        let current = self.loaded()?.sample.notes;
        if current.as_deref().map(str::trim) == notes {
            debug!(sample = %self.sample_id, "notes unchanged, nothing to submit");
            return Ok(false);
        }
        let Some(_guard) = self.surfaces.try_begin(Surface::Notes) else {
            return Err(LabError::in_progress(Surface::Notes.describe()));
        };
        let generation = self.generation.get();

        let result = self.api.set_sample_notes(&self.sample_id, notes).await;
        self.ensure_current(generation)?;
        result.map_err(LabError::from_mutation)?;
        info!(sample = %self.sample_id, cleared = notes.is_none(), "sample notes updated");
        self.refresh_after_mutation(generation).await?;
        Ok(true)
    }

    /// Upload one image. Uploads of different files run concurrently; the
    /// same filename cannot be in flight twice.
    ///
    /// # Errors
    ///
    /// As [`Self::apply_labels`].
    pub async fn upload_image(&self, upload: &ImageUpload) -> Result<Image, LabError> {
        let result = self.upload_image_inner(upload).await;
        self.report(result)
    }

    async fn upload_image_inner(&self, upload: &ImageUpload) -> Result<Image, LabError> {
        self.loaded()?;
        let Some(_guard) = self.uploads.try_begin(upload.filename.clone()) else {
            return Err(LabError::in_progress(format!("upload of {}", upload.filename)));
        };
        let generation = self.generation.get();

        let image = self.api.upload_sample_image(&self.sample_id, upload).await;
        self.ensure_current(generation)?;
        let image = image.map_err(LabError::from_mutation)?;
        info!(sample = %self.sample_id, image = %image.id, filename = %image.filename, "image uploaded");
        self.refresh_after_mutation(generation).await?;
        Ok(image)
    }

    /// Delete one image.
    ///
    /// # Errors
    ///
    /// [`LabError::ValidationRejected`] if the image is not part of the
    /// loaded view, plus the errors of [`Self::apply_labels`].
    pub async fn delete_image(&self, image_id: &ImageId) -> Result<(), LabError> {
        let result = self.delete_image_inner(image_id).await;
        self.report(result)
    }

    async fn delete_image_inner(&self, image_id: &ImageId) -> Result<(), LabError> {
        if self.loaded()?.images.find(image_id).is_none() {
            return Err(LabError::validation(format!(
                "image {image_id} does not belong to sample {}",
                self.sample_id
            )));
        }
        let Some(_guard) = self.deletions.try_begin(image_id.clone()) else {
            return Err(LabError::in_progress(format!("deletion of image {image_id}")));
        };
        let generation = self.generation.get();

        let result = self.api.delete_sample_image(&self.sample_id, image_id).await;
        self.ensure_current(generation)?;
        result.map_err(LabError::from_mutation)?;
        info!(sample = %self.sample_id, image = %image_id, "image deleted");
        self.refresh_after_mutation(generation).await
    }

    /// Create a catalog label.
    ///
    /// # Errors
    ///
    /// [`LabError::ValidationRejected`] for a bad name or color (nothing is
    /// sent), plus the errors of [`Self::apply_labels`].
    pub async fn create_label(&self, name: &str, color: Option<&str>) -> Result<Label, LabError> {
        let result = self.create_label_inner(name, color).await;
        self.report(result)
    }

    async fn create_label_inner(&self, name: &str, color: Option<&str>) -> Result<Label, LabError> {
        let Some(_guard) = self.surfaces.try_begin(Surface::Catalog) else {
            return Err(LabError::in_progress(Surface::Catalog.describe()));
        };
        let generation = self.generation.get();

        let mut catalog = self.catalog();
        let label = catalog.create(&self.api, name, color).await;
        self.ensure_current(generation)?;
        let label = label?;
        *self.catalog.borrow_mut() = catalog;
        self.relabel();
        Ok(label)
    }

    fn loaded(&self) -> Result<SampleView, LabError> {
        self.snapshot().ok_or_else(|| LabError::NotLoaded {
            sample: self.sample_id.to_string(),
        })
    }

    fn ensure_current(&self, generation: u64) -> Result<(), LabError> {
        if self.generation.get() == generation {
            Ok(())
        } else {
            debug!(sample = %self.sample_id, "discarding response after teardown");
            Err(LabError::Detached)
        }
    }

    fn report<T>(&self, result: Result<T, LabError>) -> Result<T, LabError> {
        if let Err(err) = &result {
            self.notice(err);
        }
        result
    }

    fn notice(&self, err: &LabError) {
        if matches!(err, LabError::Detached) {
            return;
        }
        warn!(sample = %self.sample_id, code = %err.code(), error = %err, "operation failed");
        self.notices.borrow_mut().push(Notice::from_error(err));
    }

    async fn refresh(&self, generation: u64) -> Result<(), LabError> {
        let (sample, images, events) = futures::try_join!(
            self.api.sample(&self.sample_id),
            self.api.sample_images(&self.sample_id),
            self.api.sample_events(&self.sample_id),
        )?;
        self.ensure_current(generation)?;

        let timeline = self.builder.build(&events, &sample);
        let degraded = timeline.degraded_count();
        if degraded > 0 {
            self.notices.borrow_mut().push(Notice {
                level: NoticeLevel::Info,
                code: ErrorCode::ProjectionDegraded.code().to_string(),
                message: format!("{degraded} event(s) with incomplete metadata"),
            });
        }

        let labels = resolve_labels(&sample.labels, &sample.order_labels, &self.catalog.borrow());
        let view = SampleView {
            state: StateDisplay::of(sample.state),
            offered: sample.state.offered_transitions().to_vec(),
            labels,
            timeline,
            images,
            events,
            sample,
        };
        *self.view.borrow_mut() = Some(view);
        Ok(())
    }

    /// Re-fetch after an accepted mutation. A failed read is reported but
    /// does not undo the mutation.
    async fn refresh_after_mutation(&self, generation: u64) -> Result<(), LabError> {
        match self.refresh(generation).await {
            Err(LabError::Detached) => Err(LabError::Detached),
            Err(err) => {
                self.notice(&err);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Recompute resolved labels from the current catalog.
    fn relabel(&self) {
        let catalog = self.catalog.borrow();
        if let Some(view) = self.view.borrow_mut().as_mut() {
            view.labels = resolve_labels(&view.sample.labels, &view.sample.order_labels, &catalog);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryLab;

    fn workspace(sample: &str) -> SampleWorkspace<MemoryLab> {
        SampleWorkspace::new(MemoryLab::demo(), SampleId::new(sample), TimelineConfig::default())
    }

    async fn loaded(sample: &str) -> SampleWorkspace<MemoryLab> {
        let ws = workspace(sample);
        ws.load().await.expect("load");
        ws
    }

    #[tokio::test]
    async fn edits_require_a_loaded_sample() {
        let ws = workspace("s-100");
        let err = ws.apply_labels(&[]).await.expect_err("not loaded");
        assert!(matches!(err, LabError::NotLoaded { .. }));
        assert_eq!(ws.notices()[0].code, "E1003");
        assert!(ws.api().mutations().is_empty());
    }

    #[tokio::test]
    async fn load_builds_view() {
        let ws = loaded("s-100").await;
        let view = ws.snapshot().expect("view");
        assert_eq!(view.state.label, "Recibida");
        assert_eq!(view.offered.len(), 3);
        let labels: Vec<_> = view
            .labels
            .iter()
            .map(|entry| (entry.label.name.as_str(), entry.inherited))
            .collect();
        assert_eq!(labels, vec![("Convenio", true), ("Repetir", false)]);
        assert!(view.timeline.synthetic);
        assert_eq!(view.timeline.len(), 2);
    }

    #[tokio::test]
    async fn label_update_refetches_and_extends_timeline() {
        let ws = loaded("s-100").await;
        ws.apply_labels(&[LabelId::new("lbl-2"), LabelId::new("lbl-1")])
            .await
            .expect("apply");

        let view = ws.snapshot().expect("view");
        let own: Vec<_> = view.sample.labels.iter().map(|a| a.label_id.as_str()).collect();
        assert_eq!(own, vec!["lbl-1"]);
        assert!(!view.timeline.synthetic);
        let texts: Vec<_> = view
            .timeline
            .entries
            .iter()
            .map(|entry| entry.narrative.plain_text())
            .collect();
        assert_eq!(
            texts,
            vec!["agregó 1 etiqueta: Urgente", "quitó 1 etiqueta: Repetir"]
        );
        assert!(view.timeline.entries[1].continuation);
    }

    #[tokio::test]
    async fn refused_update_keeps_view_and_posts_notice() {
        let ws = loaded("s-100").await;
        let before = ws.snapshot();
        ws.api().reject_next("sin permiso");

        let err = ws.apply_labels(&[]).await.expect_err("refused");
        assert!(matches!(err, LabError::UpdateRejected { .. }));
        assert_eq!(ws.snapshot(), before);
        let notices = ws.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].code, "E2001");
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(ws.notices().is_empty());
    }

    #[tokio::test]
    async fn partial_label_write_refreshes_view_before_failing() {
        let ws = loaded("s-100").await;
        ws.api().cap_label_writes(1);

        let err = ws
            .apply_labels(&[LabelId::new("lbl-1"), LabelId::new("lbl-4")])
            .await
            .expect_err("round trip mismatch");
        assert!(matches!(err, LabError::UpdateRejected { .. }));

        let view = ws.snapshot().expect("view");
        let own: Vec<_> = view.sample.labels.iter().map(|a| a.label_id.as_str()).collect();
        assert_eq!(own, vec!["lbl-1"]);
        let stored = ws.api().sample(&SampleId::new("s-100")).await.expect("sample");
        assert_eq!(view.sample.labels, stored.labels);
        assert_eq!(ws.take_notices()[0].code, "E2001");
    }

    #[tokio::test]
    async fn second_label_submission_is_refused_while_first_is_pending() {
        let ws = loaded("s-100").await;
        ws.api().set_latency(2);

        let (first, second) = tokio::join!(ws.apply_labels(&[]), ws.apply_labels(&[]));
        assert!(first.is_ok());
        assert!(matches!(second, Err(LabError::TransitionInProgress { .. })));
        assert_eq!(ws.api().mutations().len(), 1);
        assert!(!ws.is_busy(Surface::Labels));
    }

    #[tokio::test]
    async fn teardown_discards_late_response() {
        let ws = loaded("s-101").await;
        ws.api().set_latency(2);

        let (result, ()) = tokio::join!(ws.update_notes(Some("Coagulada")), async {
            ws.teardown();
        });
        assert!(matches!(result, Err(LabError::Detached)));
        assert!(ws.snapshot().is_none());
        assert!(ws.notices().is_empty());
    }

    #[tokio::test]
    async fn transition_to_current_state_is_rejected_locally() {
        let ws = loaded("s-101").await;
        let err = ws
            .request_transition(SampleState::Processing)
            .await
            .expect_err("same state");
        assert!(matches!(err, LabError::ValidationRejected { .. }));
        assert_eq!(ws.notices()[0].level, NoticeLevel::Warning);
        assert!(ws.api().mutations().is_empty());
    }

    #[tokio::test]
    async fn transition_refreshes_state_display() {
        let ws = loaded("s-101").await;
        let transition = ws.request_transition(SampleState::Ready).await.expect("move");
        assert_eq!(transition.to, SampleState::Ready);
        let view = ws.snapshot().expect("view");
        assert_eq!(view.state.label, "Lista");
        assert!(view.offered.is_empty());
        let last = view.timeline.entries.last().expect("entry");
        assert_eq!(last.narrative.plain_text(), "cambió el estado: En proceso → Lista");
    }

    #[tokio::test]
    async fn unchanged_notes_are_not_submitted() {
        let ws = loaded("s-101").await;
        assert!(!ws.update_notes(Some(" Hemólisis leve ")).await.expect("noop"));
        assert!(ws.api().mutations().is_empty());

        assert!(ws.update_notes(None).await.expect("clear"));
        let view = ws.snapshot().expect("view");
        assert!(view.sample.notes.is_none());
        let last = view.timeline.entries.last().expect("entry");
        assert_eq!(last.narrative.plain_text(), "eliminó la descripción");
    }

    #[tokio::test]
    async fn uploads_of_distinct_files_run_together() {
        let ws = loaded("s-100").await;
        ws.api().set_latency(2);

        let a = ImageUpload::new("a.jpg", vec![1]);
        let b = ImageUpload::new("b.jpg", vec![2]);
        let team = [UserId::new("u-ana"), UserId::new("u-luis")];
        let (first, second, assigned) = tokio::join!(
            ws.upload_image(&a),
            ws.upload_image(&b),
            ws.apply_assignees(&team),
        );
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert!(assigned.is_ok());

        let view = ws.snapshot().expect("view");
        assert_eq!(view.images.len(), 2);
        assert_eq!(view.sample.state, SampleState::Processing);
        assert!(view
            .timeline
            .entries
            .iter()
            .any(|entry| entry.narrative.plain_text().contains("automático")));
    }

    #[tokio::test]
    async fn same_filename_cannot_upload_twice_at_once() {
        let ws = loaded("s-100").await;
        ws.api().set_latency(2);
        let upload = ImageUpload::new("a.jpg", vec![1]);

        let (first, second) = tokio::join!(ws.upload_image(&upload), ws.upload_image(&upload));
        assert!(first.is_ok());
        assert!(matches!(second, Err(LabError::TransitionInProgress { .. })));
        assert!(!ws.is_uploading("a.jpg"));
    }

    #[tokio::test]
    async fn deleting_unknown_image_is_rejected_locally() {
        let ws = loaded("s-101").await;
        let err = ws
            .delete_image(&ImageId::new("img-404"))
            .await
            .expect_err("unknown image");
        assert!(matches!(err, LabError::ValidationRejected { .. }));

        ws.delete_image(&ImageId::new("img-1")).await.expect("delete");
        assert!(ws.snapshot().expect("view").images.is_empty());
    }

    #[tokio::test]
    async fn reference_data_and_label_creation() {
        let ws = loaded("s-100").await;
        ws.load_reference_data().await.expect("reference data");
        assert_eq!(ws.users().len(), 3);
        assert_eq!(ws.catalog().len(), 4);

        let label = ws.create_label("Hemólisis", Some("#a855f7")).await.expect("create");
        assert!(ws.catalog().get(&label.id).is_some());

        let err = ws.create_label("", None).await.expect_err("blank");
        assert!(matches!(err, LabError::ValidationRejected { .. }));
    }

    #[tokio::test]
    async fn degraded_events_post_an_info_notice() {
        let ws = workspace("s-100");
        ws.api().push_event(
            &SampleId::new("s-100"),
            serde_json::from_str(
                r#"{"id":"x1","event_type":"IMAGE_UPLOADED","metadata":{},"created_at":"2026-03-02T12:00:00Z"}"#,
            )
            .expect("event"),
        );
        ws.load().await.expect("load");
        let notices = ws.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].code, "E3001");
        assert_eq!(notices[0].level, NoticeLevel::Info);
    }
}
