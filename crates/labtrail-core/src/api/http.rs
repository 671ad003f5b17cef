//! REST implementation of [`LabApi`].
//!
//! Endpoints are resolved relative to a base URL (e.g.
//! `https://lims.example.org/api/`). Authentication is a bearer token supplied
//! through [`Credentials`]; the client never looks up tokens on its own.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::{ApiError, Credentials, ImageUpload, LabApi};
use crate::event::DomainEvent;
use crate::model::{
    Assignee, Image, ImageId, ImageSet, Label, LabelId, Sample, SampleId, SampleState, UserId,
};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the lab service.
#[derive(Clone)]
pub struct HttpLabApi {
    inner: Arc<HttpLabApiInner>,
}

struct HttpLabApiInner {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
struct StateBody {
    state: SampleState,
}

#[derive(Serialize)]
struct NotesBody<'a> {
    notes: Option<&'a str>,
}

#[derive(Serialize)]
struct AssigneesBody<'a> {
    user_ids: &'a [UserId],
}

#[derive(Serialize)]
struct LabelsBody<'a> {
    label_ids: &'a [LabelId],
}

#[derive(Serialize)]
struct NewLabelBody<'a> {
    name: &'a str,
    color: &'a str,
}

impl HttpLabApi {
    /// Create a client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(
        base_url: Url,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", credentials.token().expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| ApiError::Parse(format!("invalid token format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpLabApiInner {
                client,
                base_url: with_trailing_slash(base_url),
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::Parse(format!("invalid endpoint {path}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!(%url, "GET");
        let response = self.inner.client.get(url).send().await?;
        handle_json(response).await
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path)?;
        debug!(%url, %method, "send");
        let response = self
            .inner
            .client
            .request(method, url)
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn handle_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    response
        .json()
        .await
        .map_err(|e| ApiError::Parse(format!("failed to parse response: {e}")))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    if code == 401 || code == 403 {
        return Err(ApiError::Unauthorized);
    }
    if code == 404 {
        return Err(ApiError::NotFound(response.url().path().to_string()));
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());

    if status.is_client_error() {
        Err(ApiError::Rejected {
            status: code,
            message,
        })
    } else {
        Err(ApiError::Parse(format!("server error {code}: {message}")))
    }
}

impl LabApi for HttpLabApi {
    async fn sample(&self, id: &SampleId) -> Result<Sample, ApiError> {
        self.get(&format!("samples/{id}")).await
    }

    async fn sample_images(&self, id: &SampleId) -> Result<ImageSet, ApiError> {
        self.get(&format!("samples/{id}/images")).await
    }

    async fn sample_events(&self, id: &SampleId) -> Result<Vec<DomainEvent>, ApiError> {
        self.get(&format!("samples/{id}/events")).await
    }

    async fn set_sample_state(&self, id: &SampleId, state: SampleState) -> Result<(), ApiError> {
        self.send_json(
            reqwest::Method::PATCH,
            &format!("samples/{id}/state"),
            &StateBody { state },
        )
        .await
        .map(drop)
    }

    async fn set_sample_notes(&self, id: &SampleId, notes: Option<&str>) -> Result<(), ApiError> {
        self.send_json(
            reqwest::Method::PATCH,
            &format!("samples/{id}/notes"),
            &NotesBody { notes },
        )
        .await
        .map(drop)
    }

    async fn set_sample_assignees(
        &self,
        id: &SampleId,
        user_ids: &[UserId],
    ) -> Result<(), ApiError> {
        self.send_json(
            reqwest::Method::PUT,
            &format!("samples/{id}/assignees"),
            &AssigneesBody { user_ids },
        )
        .await
        .map(drop)
    }

    async fn set_sample_labels(&self, id: &SampleId, label_ids: &[LabelId]) -> Result<(), ApiError> {
        self.send_json(
            reqwest::Method::PUT,
            &format!("samples/{id}/labels"),
            &LabelsBody { label_ids },
        )
        .await
        .map(drop)
    }

    async fn upload_sample_image(
        &self,
        id: &SampleId,
        upload: &ImageUpload,
    ) -> Result<Image, ApiError> {
        let url = self.url(&format!("samples/{id}/images"))?;
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.filename.clone())
            .mime_str(&upload.content_type)?;
        let form = Form::new().part("file", part);
        debug!(%url, filename = %upload.filename, "upload");
        let response = self.inner.client.post(url).multipart(form).send().await?;
        handle_json(response).await
    }

    async fn delete_sample_image(&self, id: &SampleId, image_id: &ImageId) -> Result<(), ApiError> {
        let url = self.url(&format!("samples/{id}/images/{image_id}"))?;
        debug!(%url, "DELETE");
        let response = self.inner.client.delete(url).send().await?;
        check_status(response).await.map(drop)
    }

    async fn label_catalog(&self) -> Result<Vec<Label>, ApiError> {
        self.get("labels").await
    }

    async fn create_label(&self, name: &str, color: &str) -> Result<Label, ApiError> {
        let response = self
            .send_json(reqwest::Method::POST, "labels", &NewLabelBody { name, color })
            .await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("failed to parse response: {e}")))
    }

    async fn lab_users(&self) -> Result<Vec<Assignee>, ApiError> {
        self.get("users/lab").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpLabApi {
        HttpLabApi::new(
            Url::parse(base).expect("valid url"),
            &Credentials::bearer("token"),
            DEFAULT_TIMEOUT,
        )
        .expect("client builds")
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let api = client("https://lims.example.org/api");
        assert_eq!(api.base_url().as_str(), "https://lims.example.org/api/");
    }

    #[test]
    fn endpoints_resolve_under_base_path() {
        let api = client("https://lims.example.org/api/");
        let url = api.url("samples/42/events").expect("join");
        assert_eq!(url.as_str(), "https://lims.example.org/api/samples/42/events");
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let result = HttpLabApi::new(
            Url::parse("https://lims.example.org/").expect("valid url"),
            &Credentials::bearer("bad\ntoken"),
            DEFAULT_TIMEOUT,
        );
        assert!(matches!(result, Err(ApiError::Parse(_))));
    }
}
