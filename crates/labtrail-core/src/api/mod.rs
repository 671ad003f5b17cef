//! The request collaborator: every read and write the core performs against
//! the lab service goes through [`LabApi`].
//!
//! Two implementations ship with the crate:
//!
//! - [`http::HttpLabApi`]: REST client over `reqwest`, credentials passed in
//!   explicitly at construction.
//! - [`memory::MemoryLab`]: in-process service used by tests and by the CLI
//!   fixture mode. It appends the same domain events the real service does.

pub mod http;
pub mod memory;

use secrecy::SecretString;
use thiserror::Error;

use crate::event::DomainEvent;
use crate::model::{Assignee, Image, ImageId, ImageSet, Label, LabelId, Sample, SampleId, SampleState, UserId};

/// Errors returned by a [`LabApi`] implementation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a client error.
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Response body or server failure that could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Bearer credentials handed to the HTTP client by the caller.
pub struct Credentials {
    token: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }

    pub(crate) const fn token(&self) -> &SecretString {
        &self.token
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials([redacted])")
    }
}

/// A file to attach to a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Build an upload, guessing the content type from the file extension.
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = content_type_for(&filename).to_string();
        Self {
            filename,
            content_type,
            bytes,
        }
    }
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Logical operations the core consumes from the lab service.
///
/// Label and assignee writes are full replacements of the sample-local set.
// Callers drive this from a single-threaded runtime, so the returned futures
// carry no `Send` bound.
#[allow(async_fn_in_trait)]
pub trait LabApi {
    async fn sample(&self, id: &SampleId) -> Result<Sample, ApiError>;

    async fn sample_images(&self, id: &SampleId) -> Result<ImageSet, ApiError>;

    /// Events in ascending `created_at` order.
    async fn sample_events(&self, id: &SampleId) -> Result<Vec<DomainEvent>, ApiError>;

    async fn set_sample_state(&self, id: &SampleId, state: SampleState) -> Result<(), ApiError>;

    /// `None` clears the notes.
    async fn set_sample_notes(&self, id: &SampleId, notes: Option<&str>) -> Result<(), ApiError>;

    async fn set_sample_assignees(&self, id: &SampleId, user_ids: &[UserId]) -> Result<(), ApiError>;

    async fn set_sample_labels(&self, id: &SampleId, label_ids: &[LabelId]) -> Result<(), ApiError>;

    async fn upload_sample_image(&self, id: &SampleId, upload: &ImageUpload) -> Result<Image, ApiError>;

    async fn delete_sample_image(&self, id: &SampleId, image_id: &ImageId) -> Result<(), ApiError>;

    async fn label_catalog(&self) -> Result<Vec<Label>, ApiError>;

    async fn create_label(&self, name: &str, color: &str) -> Result<Label, ApiError>;

    async fn lab_users(&self) -> Result<Vec<Assignee>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::{Credentials, ImageUpload};

    #[test]
    fn upload_guesses_content_type() {
        assert_eq!(ImageUpload::new("frotis.JPG", vec![]).content_type, "image/jpeg");
        assert_eq!(ImageUpload::new("scan.png", vec![]).content_type, "image/png");
        assert_eq!(
            ImageUpload::new("sin_extension", vec![]).content_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::bearer("s3cret");
        assert!(!format!("{creds:?}").contains("s3cret"));
    }
}
