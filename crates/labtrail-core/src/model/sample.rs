use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{Assignee, LabelAssignment, SampleId};

/// The five lifecycle states of a laboratory sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SampleState {
    Received,
    Processing,
    Ready,
    Damaged,
    Cancelled,
}

impl SampleState {
    pub const ALL: [Self; 5] = [
        Self::Received,
        Self::Processing,
        Self::Ready,
        Self::Damaged,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::Processing => "PROCESSING",
            Self::Ready => "READY",
            Self::Damaged => "DAMAGED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Terminal states offer no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Damaged | Self::Cancelled)
    }

    /// Transitions offered from this state.
    ///
    /// - `RECEIVED -> PROCESSING`
    /// - `PROCESSING -> READY`
    /// - `DAMAGED` and `CANCELLED` from any non-terminal state
    #[must_use]
    pub const fn offered_transitions(self) -> &'static [Self] {
        match self {
            Self::Received => &[Self::Processing, Self::Damaged, Self::Cancelled],
            Self::Processing => &[Self::Ready, Self::Damaged, Self::Cancelled],
            Self::Ready | Self::Damaged | Self::Cancelled => &[],
        }
    }

    #[must_use]
    pub fn offers(self, target: Self) -> bool {
        self.offered_transitions().contains(&target)
    }
}

impl fmt::Display for SampleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a sample state from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStateError {
    pub got: String,
}

impl fmt::Display for ParseStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid sample state '{}': expected one of RECEIVED, PROCESSING, READY, DAMAGED, CANCELLED",
            self.got
        )
    }
}

impl std::error::Error for ParseStateError {}

impl FromStr for SampleState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| ParseStateError { got: s.to_string() })
    }
}

/// Sample detail as returned by the lab service.
///
/// `labels` are the sample's own assignments and `order_labels` the parent
/// order's; the effective label view is derived from both on every read and
/// is never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    pub code: String,
    #[serde(rename = "type")]
    pub sample_type: String,
    pub state: SampleState,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub order_ref: Option<String>,
    #[serde(default)]
    pub branch_ref: Option<String>,
    #[serde(default)]
    pub patient_ref: Option<String>,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<LabelAssignment>,
    #[serde(default)]
    pub order_labels: Vec<LabelAssignment>,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
}
