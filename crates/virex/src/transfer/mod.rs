//! Transfer client: timeouts, bounded retry and streaming bodies.

pub mod client;
pub mod error;
pub mod request;
pub mod retry;
pub mod transport;

pub use client::TransferClient;
pub use error::{FailureKind, TransferError, TransportError};
pub use request::{
    BodyStream, FormPart, HttpRequest, Method, RequestBody, TransferRequest, TransferResponse,
};
pub use retry::{with_retry, RetryPolicy};
pub use transport::{ReqwestTransport, Transport};
