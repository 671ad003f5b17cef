//! Assignee set reconciliation.
//!
//! The picker works on a full selection; the service stores a full set. The
//! reconciler computes what changed for display and submits the whole
//! selection as one replacement. Assignees are never inherited from orders.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::api::LabApi;
use crate::error::LabError;
use crate::model::{Sample, SampleId, UserId};

/// Difference between a selection and the persisted set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssigneeDelta {
    /// Selected but not persisted, sorted.
    pub added: Vec<UserId>,
    /// Persisted but not selected, sorted.
    pub removed: Vec<UserId>,
}

impl AssigneeDelta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssigneeSetReconciler {
    persisted: BTreeSet<UserId>,
}

impl AssigneeSetReconciler {
    pub fn new(persisted: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            persisted: persisted.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn from_sample(sample: &Sample) -> Self {
        Self::new(sample.assignees.iter().map(|a| a.id.clone()))
    }

    #[must_use]
    pub const fn persisted(&self) -> &BTreeSet<UserId> {
        &self.persisted
    }

    #[must_use]
    pub fn delta(&self, selection: &[UserId]) -> AssigneeDelta {
        let selected: BTreeSet<&UserId> = selection.iter().collect();
        AssigneeDelta {
            added: selected
                .iter()
                .filter(|id| !self.persisted.contains(**id))
                .map(|id| (*id).clone())
                .collect(),
            removed: self
                .persisted
                .iter()
                .filter(|id| !selected.contains(id))
                .cloned()
                .collect(),
        }
    }

    /// Replace the sample's assignees with `selection`.
    ///
    /// Duplicates are collapsed (first occurrence kept). When the selection
    /// equals the persisted set nothing is sent. Last write wins on the
    /// service side.
    ///
    /// # Errors
    ///
    /// [`LabError::UpdateRejected`] if the service refuses;
    /// [`LabError::Request`] on transport failure. The persisted set is left
    /// unchanged on error.
    pub async fn apply<A: LabApi>(
        &mut self,
        api: &A,
        sample_id: &SampleId,
        selection: &[UserId],
    ) -> Result<AssigneeDelta, LabError> {
        let delta = self.delta(selection);
        if delta.is_empty() {
            debug!(sample = %sample_id, "assignee selection unchanged, nothing to submit");
            return Ok(delta);
        }

        let mut seen = HashSet::new();
        let submitted: Vec<UserId> = selection
            .iter()
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect();

        api.set_sample_assignees(sample_id, &submitted)
            .await
            .map_err(LabError::from_mutation)?;

        info!(
            sample = %sample_id,
            added = delta.added.len(),
            removed = delta.removed.len(),
            "sample assignees replaced"
        );
        self.persisted = submitted.into_iter().collect();
        Ok(delta)
    }
}
