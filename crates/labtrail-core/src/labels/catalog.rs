//! Tenant-wide label catalog.

use std::collections::HashMap;

use tracing::info;

use crate::api::LabApi;
use crate::error::LabError;
use crate::model::{Label, LabelAssignment, LabelId};

/// Color given to new labels when the caller does not pick one.
pub const DEFAULT_LABEL_COLOR: &str = "#3b82f6";

/// Longest accepted label name, in characters.
pub const MAX_NAME_LEN: usize = 64;

/// Labels known to the tenant, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCatalog {
    labels: Vec<Label>,
    index: HashMap<LabelId, usize>,
}

impl LabelCatalog {
    #[must_use]
    pub fn from_labels(labels: Vec<Label>) -> Self {
        let mut index = HashMap::with_capacity(labels.len());
        for (pos, label) in labels.iter().enumerate() {
            index.entry(label.id.clone()).or_insert(pos);
        }
        Self { labels, index }
    }

    /// Fetch the catalog from the lab service.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::Request`] if the read fails.
    pub async fn load<A: LabApi>(api: &A) -> Result<Self, LabError> {
        Ok(Self::from_labels(api.label_catalog().await?))
    }

    #[must_use]
    pub fn get(&self, id: &LabelId) -> Option<&Label> {
        self.index.get(id).map(|&pos| &self.labels[pos])
    }

    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label to render for an assignment: the catalog entry if present,
    /// otherwise the name/color stored with the assignment.
    #[must_use]
    pub fn display(&self, assignment: &LabelAssignment) -> Label {
        self.get(&assignment.label_id)
            .cloned()
            .unwrap_or_else(|| assignment.to_label())
    }

    /// Validate and create a label, then add it to this catalog.
    ///
    /// `color` falls back to [`DEFAULT_LABEL_COLOR`] when `None`.
    ///
    /// # Errors
    ///
    /// [`LabError::ValidationRejected`] for a blank or overlong name or a
    /// malformed color (nothing is sent); [`LabError::UpdateRejected`] if the
    /// service refuses.
    pub async fn create<A: LabApi>(
        &mut self,
        api: &A,
        name: &str,
        color: Option<&str>,
    ) -> Result<Label, LabError> {
        let color = color.unwrap_or(DEFAULT_LABEL_COLOR);
        let name = validate_name(name)?;
        validate_color(color)?;

        let label = api
            .create_label(name, color)
            .await
            .map_err(LabError::from_mutation)?;
        info!(id = %label.id, name = %label.name, "label created");

        self.index.entry(label.id.clone()).or_insert(self.labels.len());
        self.labels.push(label.clone());
        Ok(label)
    }
}

/// Trimmed label name, rejected if empty or longer than [`MAX_NAME_LEN`].
///
/// # Errors
///
/// Returns [`LabError::ValidationRejected`] describing the problem.
pub fn validate_name(name: &str) -> Result<&str, LabError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LabError::validation("label name must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(LabError::validation(format!(
            "label name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed)
}

/// Accept `#RGB` and `#RRGGBB` hex colors.
///
/// # Errors
///
/// Returns [`LabError::ValidationRejected`] for anything else.
pub fn validate_color(color: &str) -> Result<(), LabError> {
    let valid = color.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
    });
    if valid {
        Ok(())
    } else {
        Err(LabError::validation(format!(
            "invalid color '{color}': expected #RGB or #RRGGBB"
        )))
    }
}
