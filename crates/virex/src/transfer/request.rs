//! Request and response types handed to and returned from a [`Transport`].
//!
//! [`Transport`]: super::transport::Transport

use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::error::TransferError;

const DEFAULT_UPLOAD_MIME: &str = "video/mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// Request body. File parts are re-opened on every attempt and streamed from disk.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        path: PathBuf,
        file_name: String,
        mime: String,
    },
}

/// A request against the configured endpoint, relative to its base URL.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    /// Attach identity headers from the session.
    pub authenticated: bool,
}

impl TransferRequest {
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            authenticated: false,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Appends a form part, turning any other body into a multipart one.
    fn push_part(mut self, part: FormPart) -> Self {
        self.body = match self.body {
            RequestBody::Multipart(mut parts) => {
                parts.push(part);
                RequestBody::Multipart(parts)
            }
            _ => RequestBody::Multipart(vec![part]),
        };
        self
    }

    pub fn text_part(self, name: &str, value: &str) -> Self {
        self.push_part(FormPart::Text {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Adds a file part; the MIME type is guessed from the extension.
    pub fn file_part(self, name: &str, path: &Path) -> Self {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.mp4")
            .to_string();
        let mime = mime_guess::from_path(path)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| DEFAULT_UPLOAD_MIME.to_string());

        self.push_part(FormPart::File {
            name: name.to_string(),
            path: path.to_path_buf(),
            file_name,
            mime,
        })
    }
}

/// A request resolved against the session: absolute URL plus identity headers.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl std::fmt::Debug for HttpRequest {
    // Header values may carry credentials.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("body", &self.body)
            .finish()
    }
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub type BodyStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Any response the server produced, whatever its status.
pub struct TransferResponse {
    status: StatusCode,
    headers: Vec<(String, String)>,
    content_length: Option<u64>,
    body: BodyStream,
}

impl std::fmt::Debug for TransferResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl TransferResponse {
    pub fn new(
        status: StatusCode,
        headers: Vec<(String, String)>,
        content_length: Option<u64>,
        body: BodyStream,
    ) -> Self {
        Self {
            status,
            headers,
            content_length,
            body,
        }
    }

    /// Response with an in-memory body.
    pub fn from_bytes(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        let len = body.len() as u64;
        let stream = futures_util::stream::once(async move { Ok::<_, std::io::Error>(body) });
        Self::new(status, Vec::new(), Some(len), Box::pin(stream))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn into_body(self) -> BodyStream {
        self.body
    }

    /// Collects the body into memory. Only for small JSON/text replies.
    pub async fn bytes(self) -> Result<Vec<u8>, TransferError> {
        self.body
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .map_err(TransferError::Body)
    }

    pub async fn text(self) -> Result<String, TransferError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T, TransferError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| TransferError::Decode(e.to_string()))
    }
}
