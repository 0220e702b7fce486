//! HTTP seam to the identity service.

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde_json::Value;
use shared::{
    domain::WorkflowKind,
    protocol::{ErrorBody, IMAGE_FIELD},
};
use thiserror::Error;
use url::Url;

/// Image bytes plus the metadata forwarded in the multipart part.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub file_name: String,
    pub media_type: Option<String>,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("server responded with status {status}")]
    Status { status: u16, message: Option<String> },
    #[error("undecodable response body: {0}")]
    InvalidBody(String),
    #[error("no response from server: {0}")]
    Network(String),
    #[error("{0}")]
    Client(String),
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Posts one image to the workflow's endpoint and returns the raw JSON
    /// body of a 2xx response (`Value::Null` for an empty body).
    async fn submit(
        &self,
        kind: WorkflowKind,
        upload: UploadPayload,
    ) -> Result<Value, TransportError>;
}

pub struct HttpIdentityService {
    http: Client,
    base_url: Url,
}

impl HttpIdentityService {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build identity service http client")?;
        Self::with_client(base_url, http)
    }

    fn with_client(base_url: &str, http: Client) -> Result<Self> {
        let mut base_url = Url::parse(base_url.trim())
            .with_context(|| format!("invalid identity service url '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("identity service url '{base_url}' cannot carry paths"));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, kind: WorkflowKind) -> Result<Url, TransportError> {
        self.base_url
            .join(kind.endpoint())
            .map_err(|err| TransportError::Client(format!("invalid endpoint url: {err}")))
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn submit(
        &self,
        kind: WorkflowKind,
        upload: UploadPayload,
    ) -> Result<Value, TransportError> {
        let url = self.endpoint(kind)?;
        let mut part = Part::bytes(upload.bytes.to_vec()).file_name(upload.file_name);
        if let Some(media_type) = upload.media_type.as_deref() {
            part = part
                .mime_str(media_type)
                .map_err(|err| TransportError::Client(err.to_string()))?;
        }
        let form = Form::new().part(IMAGE_FIELD, part);

        tracing::debug!(workflow = %kind, %url, "posting image to identity service");
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        let body = response.bytes().await;
        if !status.is_success() {
            let message = body
                .ok()
                .and_then(|bytes| serde_json::from_slice::<ErrorBody>(&bytes).ok())
                .and_then(|body| body.error);
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        // A body that cannot be read is a lost connection, not a bad payload.
        let body = body.map_err(classify_send_error)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|err| TransportError::InvalidBody(err.to_string()))
    }
}

fn classify_send_error(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::Client(err.to_string())
    } else if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
        TransportError::Network(err.to_string())
    } else {
        TransportError::Client(err.to_string())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
