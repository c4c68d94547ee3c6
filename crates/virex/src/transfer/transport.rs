//! Low-level transport seam.
//!
//! A transport performs exactly one attempt and classifies its failure. Retry
//! lives above it, in [`super::retry`].

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};

use super::error::{TransferError, TransportError};
use super::request::{FormPart, HttpRequest, Method, RequestBody, TransferResponse};
use crate::config::TransferConfig;

const USER_AGENT: &str = concat!("virex/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a single attempt. Any response that arrives is `Ok`, whatever its status.
    async fn execute(&self, request: &HttpRequest) -> Result<TransferResponse, TransportError>;
}

/// HTTP transport over a shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// No overall deadline is set: the read timeout bounds each wait for data,
    /// so a long transfer that keeps making progress is never cut off.
    pub fn new(config: &TransferConfig) -> Result<Self, TransferError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransferError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn build_form(parts: &[FormPart]) -> Result<Form, TransportError> {
        let mut form = Form::new();

        for part in parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    path,
                    file_name,
                    mime,
                } => {
                    let file = tokio::fs::File::open(path).await.map_err(|e| {
                        TransportError::local_io(format!("cannot open {}: {}", file_name, e))
                    })?;
                    let length = file
                        .metadata()
                        .await
                        .map_err(|e| {
                            TransportError::local_io(format!("cannot stat {}: {}", file_name, e))
                        })?
                        .len();

                    let file_part = Part::stream_with_length(Body::from(file), length)
                        .file_name(file_name.clone())
                        .mime_str(mime)
                        .map_err(|e| TransportError::other(format!("bad MIME type: {}", e)))?;
                    form.part(name.clone(), file_part)
                }
            };
        }

        Ok(form)
    }
}

/// Maps a reqwest failure to the retry classification.
fn classify(err: &reqwest::Error) -> TransportError {
    if err.is_connect() {
        TransportError::connect(err.to_string())
    } else if err.is_timeout() {
        TransportError::timeout(err.to_string())
    } else {
        TransportError::other(err.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<TransferResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => builder.multipart(Self::build_form(parts).await?),
        };

        let response = builder.send().await.map_err(|e| classify(&e))?;

        let status = response.status();
        let content_length = response.content_length();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response.bytes_stream().map_err(|e| {
            let kind = if e.is_timeout() {
                std::io::ErrorKind::TimedOut
            } else {
                std::io::ErrorKind::Other
            };
            std::io::Error::new(kind, e)
        });

        Ok(TransferResponse::new(
            status,
            headers,
            content_length,
            Box::pin(body),
        ))
    }
}
