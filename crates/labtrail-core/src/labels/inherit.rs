//! Label inheritance from a sample's parent order.
//!
//! The effective label set of a sample is derived on every read from two
//! inputs: the sample's own assignments and the order's assignments. Nothing
//! here is cached; callers recompute after each fetch so the view never goes
//! stale against the order's live labels.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use super::catalog::LabelCatalog;
use crate::api::LabApi;
use crate::error::LabError;
use crate::model::{Label, LabelAssignment, LabelId, SampleId};

/// A label as displayed on a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLabel {
    pub label: Label,
    /// Sourced from the order and not assigned on the sample itself.
    pub inherited: bool,
}

/// Merge own and order assignments into the display list.
///
/// Inherited entries come first, then own entries, each group in source
/// order. An id assigned on both levels appears once, as an own label.
/// Catalog data wins for name/color; ids the catalog does not know fall back
/// to the assignment record.
#[must_use]
pub fn resolve_labels(
    own: &[LabelAssignment],
    order: &[LabelAssignment],
    catalog: &LabelCatalog,
) -> Vec<ResolvedLabel> {
    let own_ids: HashSet<&LabelId> = own.iter().map(|a| &a.label_id).collect();
    let mut seen: HashSet<&LabelId> = HashSet::new();
    let mut resolved = Vec::with_capacity(own.len() + order.len());

    for assignment in order {
        if own_ids.contains(&assignment.label_id) || !seen.insert(&assignment.label_id) {
            continue;
        }
        resolved.push(ResolvedLabel {
            label: catalog.display(assignment),
            inherited: true,
        });
    }

    for assignment in own {
        if !seen.insert(&assignment.label_id) {
            continue;
        }
        resolved.push(ResolvedLabel {
            label: catalog.display(assignment),
            inherited: false,
        });
    }

    resolved
}

/// Ids that are visible only through the order.
#[must_use]
pub fn inherited_ids(resolved: &[ResolvedLabel]) -> HashSet<LabelId> {
    resolved
        .iter()
        .filter(|entry| entry.inherited)
        .map(|entry| entry.label.id.clone())
        .collect()
}

/// The own-assignment set to submit for a selection: `selected \ inherited`,
/// duplicates collapsed, first-seen order kept.
#[must_use]
pub fn own_selection(resolved: &[ResolvedLabel], selected: &[LabelId]) -> Vec<LabelId> {
    let inherited = inherited_ids(resolved);
    let mut seen = HashSet::new();
    selected
        .iter()
        .filter(|id| !inherited.contains(*id) && seen.insert(*id))
        .cloned()
        .collect()
}

/// Replace the sample's own labels with `selected` minus inherited ids.
///
/// Submits the full set, then re-reads the sample and verifies the own-label
/// set round-tripped. Order-level assignments are never part of the request.
///
/// # Errors
///
/// [`LabError::UpdateRejected`] if the service refuses the update or the next
/// read does not reflect it; [`LabError::Request`] on transport failure.
pub async fn apply_label_selection<A: LabApi>(
    api: &A,
    sample_id: &SampleId,
    resolved: &[ResolvedLabel],
    selected: &[LabelId],
) -> Result<Vec<LabelId>, LabError> {
    let submitted = own_selection(resolved, selected);

    api.set_sample_labels(sample_id, &submitted)
        .await
        .map_err(LabError::from_mutation)?;

    let reread = api.sample(sample_id).await?;
    let persisted: HashSet<&LabelId> = reread.labels.iter().map(|a| &a.label_id).collect();
    let expected: HashSet<&LabelId> = submitted.iter().collect();
    if persisted != expected {
        warn!(
            sample = %sample_id,
            submitted = submitted.len(),
            persisted = persisted.len(),
            "label update did not round-trip"
        );
        return Err(LabError::UpdateRejected {
            reason: format!("labels for sample {sample_id} did not match after update"),
        });
    }

    info!(sample = %sample_id, labels = submitted.len(), "sample labels replaced");
    Ok(submitted)
}

/// Editing state of the label picker for one sample.
///
/// Inherited labels are shown but locked: toggling them does nothing here,
/// they can only be removed from the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSelection {
    locked: HashSet<LabelId>,
    selected: Vec<LabelId>,
}

impl LabelSelection {
    /// Seed from the current resolution: every own label starts selected.
    #[must_use]
    pub fn from_resolved(resolved: &[ResolvedLabel]) -> Self {
        Self {
            locked: inherited_ids(resolved),
            selected: resolved
                .iter()
                .filter(|entry| !entry.inherited)
                .map(|entry| entry.label.id.clone())
                .collect(),
        }
    }

    /// Flip `id`. Returns `false` (and changes nothing) for inherited ids.
    pub fn toggle(&mut self, id: &LabelId) -> bool {
        if self.locked.contains(id) {
            return false;
        }
        if let Some(pos) = self.selected.iter().position(|s| s == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id.clone());
        }
        true
    }

    #[must_use]
    pub fn is_locked(&self, id: &LabelId) -> bool {
        self.locked.contains(id)
    }

    #[must_use]
    pub fn is_selected(&self, id: &LabelId) -> bool {
        self.selected.contains(id)
    }

    /// Own label ids to submit.
    #[must_use]
    pub fn selected_ids(&self) -> &[LabelId] {
        &self.selected
    }
}
