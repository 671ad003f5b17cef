//! Sample lifecycle: display metadata and guarded transitions.
//!
//! ```text
//! RECEIVED ──> PROCESSING ──> READY
//!    │             │
//!    ├─> DAMAGED <─┤
//!    └─> CANCELLED <┘
//! ```
//!
//! The graph decides what the UI offers. It does not block requests: a target
//! outside the offered set is logged and forwarded, and the lab service has
//! the final word.

use serde::Serialize;
use tracing::{info, warn};

use crate::api::LabApi;
use crate::error::LabError;
use crate::event::EventType;
use crate::inflight::InFlight;
use crate::model::{Sample, SampleId, SampleState};

/// How a state is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateDisplay {
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub terminal: bool,
}

impl StateDisplay {
    #[must_use]
    pub const fn of(state: SampleState) -> Self {
        let (label, color, icon) = match state {
            SampleState::Received => ("Recibida", "#3b82f6", "inbox"),
            SampleState::Processing => ("En proceso", "#f59e0b", "loader"),
            SampleState::Ready => ("Lista", "#10b981", "check-circle"),
            SampleState::Damaged => ("Dañada", "#ef4444", "alert-triangle"),
            SampleState::Cancelled => ("Cancelada", "#6b7280", "x-circle"),
        };
        Self {
            label,
            color,
            icon,
            terminal: state.is_terminal(),
        }
    }
}

/// Event type the service records for a transition into `target`.
#[must_use]
pub const fn expected_event(target: SampleState) -> EventType {
    match target {
        SampleState::Damaged => EventType::SampleDamaged,
        SampleState::Cancelled => EventType::SampleCancelled,
        _ => EventType::SampleStateChanged,
    }
}

/// A transition the service accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub sample: SampleId,
    pub from: SampleState,
    pub to: SampleState,
    /// The event that should appear in the sample's timeline after a
    /// re-fetch.
    pub expected_event: EventType,
}

/// Executes transitions, at most one in flight per sample.
#[derive(Debug, Default)]
pub struct SampleStateMachine {
    in_flight: InFlight<SampleId>,
}

impl SampleStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_pending(&self, sample: &SampleId) -> bool {
        self.in_flight.is_pending(sample)
    }

    /// Ask the service to move `sample` into `target`.
    ///
    /// `sample` is the last loaded detail; its `state` is taken as current.
    ///
    /// # Errors
    ///
    /// - [`LabError::ValidationRejected`] if `target` is the current state
    /// - [`LabError::TransitionInProgress`] if a transition for this sample is
    ///   still outstanding
    /// - [`LabError::UpdateRejected`] if the service refuses
    /// - [`LabError::Request`] on transport failure
    pub async fn request_transition<A: LabApi>(
        &self,
        api: &A,
        sample: &Sample,
        target: SampleState,
    ) -> Result<Transition, LabError> {
        let from = sample.state;
        if from == target {
            return Err(LabError::validation(format!(
                "sample {} is already {target}",
                sample.code
            )));
        }

        let Some(_guard) = self.in_flight.try_begin(sample.id.clone()) else {
            return Err(LabError::in_progress(format!(
                "state transition for sample {}",
                sample.code
            )));
        };

        if !from.offers(target) {
            warn!(
                sample = %sample.id,
                %from,
                to = %target,
                "transition not offered from current state, forwarding anyway"
            );
        }

        api.set_sample_state(&sample.id, target)
            .await
            .map_err(LabError::from_mutation)?;

        info!(sample = %sample.id, %from, to = %target, "sample state changed");
        Ok(Transition {
            sample: sample.id.clone(),
            from,
            to: target,
            expected_event: expected_event(target),
        })
    }
}
