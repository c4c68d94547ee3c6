//! In-process transport that replays a script of outcomes, one per attempt.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use reqwest::StatusCode;
use tokio::time::Instant;

use virex::transfer::{
    FormPart, HttpRequest, RequestBody, TransferResponse, Transport, TransportError,
};

static ZEROS: [u8; 64 * 1024] = [0; 64 * 1024];

/// Outcome of a single scripted attempt.
#[derive(Debug, Clone)]
pub enum Step {
    /// Connection refused.
    Connect,
    /// Request timed out.
    Timeout,
    /// Response with an in-memory body.
    Respond { status: u16, body: Vec<u8> },
    /// Response streaming `total` zero bytes in 64 KiB chunks.
    Stream { status: u16, total: usize },
    /// Response whose body fails after `first` has been delivered.
    Interrupted { status: u16, first: Vec<u8> },
}

impl Step {
    pub fn ok(body: &[u8]) -> Self {
        Step::Respond {
            status: 200,
            body: body.to_vec(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Step::Respond {
            status,
            body: body.as_bytes().to_vec(),
        }
    }
}

/// What the transport saw on one attempt.
#[derive(Debug, Clone)]
pub struct Call {
    pub at: Instant,
    pub url: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub text_parts: Vec<(String, String)>,
    pub file_parts: Vec<String>,
    /// Whether every file part existed on disk when the attempt was made.
    pub files_present: bool,
}

impl Call {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text_part(&self, name: &str) -> Option<&str> {
        self.text_parts
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, step: Step) {
        self.steps.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, request: &HttpRequest) {
        let mut text_parts = Vec::new();
        let mut file_parts = Vec::new();
        let mut files_present = true;

        if let RequestBody::Multipart(parts) = &request.body {
            for part in parts {
                match part {
                    FormPart::Text { name, value } => text_parts.push((name.clone(), value.clone())),
                    FormPart::File { name, path, .. } => {
                        files_present &= path.is_file();
                        file_parts.push(name.clone());
                    }
                }
            }
        }

        self.calls.lock().unwrap().push(Call {
            at: Instant::now(),
            url: request.url.clone(),
            path: request.path.clone(),
            headers: request.headers.clone(),
            text_parts,
            file_parts,
            files_present,
        });
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap()
}

fn zero_chunks(total: usize) -> Vec<std::io::Result<Bytes>> {
    let mut chunks = Vec::with_capacity(total / ZEROS.len() + 1);
    let mut remaining = total;
    while remaining > 0 {
        let len = remaining.min(ZEROS.len());
        chunks.push(Ok(Bytes::from_static(&ZEROS[..len])));
        remaining -= len;
    }
    chunks
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<TransferResponse, TransportError> {
        self.record(request);

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            None => Err(TransportError::other("no scripted outcome left")),
            Some(Step::Connect) => Err(TransportError::connect("connection refused")),
            Some(Step::Timeout) => Err(TransportError::timeout("operation timed out")),
            Some(Step::Respond { status, body }) => {
                Ok(TransferResponse::from_bytes(status_code(status), body))
            }
            Some(Step::Stream { status, total }) => Ok(TransferResponse::new(
                status_code(status),
                Vec::new(),
                Some(total as u64),
                Box::pin(stream::iter(zero_chunks(total))),
            )),
            Some(Step::Interrupted { status, first }) => {
                let chunks = vec![
                    Ok(Bytes::from(first)),
                    Err(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection reset by peer",
                    )),
                ];
                Ok(TransferResponse::new(
                    status_code(status),
                    Vec::new(),
                    None,
                    Box::pin(stream::iter(chunks)),
                ))
            }
        }
    }
}
