use std::fmt;
use thiserror::Error;

use crate::api::ApiError;

/// Machine-readable error codes for UI notices and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ValidationRejected,
    ConfigParseError,
    SampleNotLoaded,
    BackendMissing,
    UpdateRejected,
    TransitionInProgress,
    ProjectionDegraded,
    RequestFailed,
    Unauthorized,
    ViewDetached,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ValidationRejected => "E1001",
            Self::ConfigParseError => "E1002",
            Self::SampleNotLoaded => "E1003",
            Self::BackendMissing => "E1004",
            Self::UpdateRejected => "E2001",
            Self::TransitionInProgress => "E2002",
            Self::ProjectionDegraded => "E3001",
            Self::RequestFailed => "E5001",
            Self::Unauthorized => "E5002",
            Self::ViewDetached => "E5003",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ValidationRejected => "Rejected before submission",
            Self::ConfigParseError => "Config file parse error",
            Self::SampleNotLoaded => "Sample not loaded",
            Self::BackendMissing => "No lab service configured",
            Self::UpdateRejected => "Update rejected by the lab service",
            Self::TransitionInProgress => "Operation already in progress",
            Self::ProjectionDegraded => "Event metadata incomplete",
            Self::RequestFailed => "Request failed",
            Self::Unauthorized => "Not authorized",
            Self::ViewDetached => "View closed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ValidationRejected => Some("Correct the input and submit again."),
            Self::ConfigParseError => Some("Fix syntax in .labtrail/config.toml and retry."),
            Self::SampleNotLoaded => Some("Load the sample before editing it."),
            Self::BackendMissing => {
                Some("Pass --api URL, set LABTRAIL_API_URL, or use --fixture PATH.")
            }
            Self::UpdateRejected => Some("Reload the sample; someone may have changed it."),
            Self::TransitionInProgress => Some("Wait for the pending submission to finish."),
            Self::ProjectionDegraded | Self::ViewDetached => None,
            Self::RequestFailed => Some("Check connectivity to the lab service and retry."),
            Self::Unauthorized => Some("Set a valid token (LABTRAIL_TOKEN) and retry."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failure of a workflow operation on a sample.
#[derive(Debug, Error)]
pub enum LabError {
    /// A client-side guard failed; nothing was sent.
    #[error("{code}: {reason}", code = ErrorCode::ValidationRejected.code())]
    ValidationRejected { reason: String },

    /// An edit was attempted before the sample detail was loaded.
    #[error("{code}: sample {sample} is not loaded", code = ErrorCode::SampleNotLoaded.code())]
    NotLoaded { sample: String },

    /// The lab service declined a mutation.
    #[error("{code}: {reason}", code = ErrorCode::UpdateRejected.code())]
    UpdateRejected { reason: String },

    /// An equivalent submission is still outstanding.
    #[error("{code}: {operation} already in progress", code = ErrorCode::TransitionInProgress.code())]
    TransitionInProgress { operation: String },

    /// A read or transport failure.
    #[error("{code}: {0}", code = ErrorCode::RequestFailed.code())]
    Request(#[source] ApiError),

    /// The view was torn down before the response arrived.
    #[error("{code}: response discarded after teardown", code = ErrorCode::ViewDetached.code())]
    Detached,
}

impl LabError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::ValidationRejected {
            reason: reason.into(),
        }
    }

    pub fn in_progress(operation: impl Into<String>) -> Self {
        Self::TransitionInProgress {
            operation: operation.into(),
        }
    }

    /// Classify a collaborator failure on a write.
    ///
    /// Refusals (4xx) become [`LabError::UpdateRejected`]; transport and decode
    /// failures stay [`LabError::Request`].
    #[must_use]
    pub fn from_mutation(err: ApiError) -> Self {
        match err {
            ApiError::Rejected { status, message } => Self::UpdateRejected {
                reason: format!("{status}: {message}"),
            },
            ApiError::NotFound(what) => Self::UpdateRejected {
                reason: format!("not found: {what}"),
            },
            other => Self::Request(other),
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ValidationRejected { .. } => ErrorCode::ValidationRejected,
            Self::NotLoaded { .. } => ErrorCode::SampleNotLoaded,
            Self::UpdateRejected { .. } => ErrorCode::UpdateRejected,
            Self::TransitionInProgress { .. } => ErrorCode::TransitionInProgress,
            Self::Request(ApiError::Unauthorized) => ErrorCode::Unauthorized,
            Self::Request(_) => ErrorCode::RequestFailed,
            Self::Detached => ErrorCode::ViewDetached,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

impl From<ApiError> for LabError {
    fn from(err: ApiError) -> Self {
        Self::Request(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, LabError};
    use crate::api::ApiError;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ValidationRejected,
            ErrorCode::ConfigParseError,
            ErrorCode::SampleNotLoaded,
            ErrorCode::BackendMissing,
            ErrorCode::UpdateRejected,
            ErrorCode::TransitionInProgress,
            ErrorCode::ProjectionDegraded,
            ErrorCode::RequestFailed,
            ErrorCode::Unauthorized,
            ErrorCode::ViewDetached,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::UpdateRejected.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn mutation_refusal_maps_to_update_rejected() {
        let err = LabError::from_mutation(ApiError::Rejected {
            status: 409,
            message: "conflict".into(),
        });
        assert_eq!(err.code(), ErrorCode::UpdateRejected);
        assert!(err.to_string().contains("409"));
    }

    #[test]
    fn transport_failure_stays_request_error() {
        let err = LabError::from_mutation(ApiError::Parse("bad body".into()));
        assert_eq!(err.code(), ErrorCode::RequestFailed);

        let unauthorized = LabError::from(ApiError::Unauthorized);
        assert_eq!(unauthorized.code(), ErrorCode::Unauthorized);
        assert!(unauthorized.hint().is_some());
    }
}
