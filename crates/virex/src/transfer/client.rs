use std::sync::Arc;

use tracing::{debug, info_span, Instrument};

use super::error::TransferError;
use super::request::{HttpRequest, TransferRequest, TransferResponse};
use super::retry::{with_retry, RetryPolicy};
use super::transport::{ReqwestTransport, Transport};
use crate::config::{validate_server_url, TransferConfig};
use crate::session::SessionStore;

/// Outbound client for the processing service.
///
/// Cheap to clone and safe for concurrent use: it holds no per-call state. The
/// base URL and identity are read from the session on every call so endpoint
/// changes take effect immediately.
#[derive(Clone)]
pub struct TransferClient {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for TransferClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferClient")
            .field("server_url", &self.session.server_url())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl TransferClient {
    pub fn new(config: &TransferConfig, session: Arc<SessionStore>) -> Result<Self, TransferError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            session,
            RetryPolicy::from_config(config),
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        session: Arc<SessionStore>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            session,
            policy,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Resolves the request against the current endpoint and identity.
    ///
    /// Fails with a precondition error, before any network activity, when the
    /// request needs identity and the session has none.
    pub fn prepare(&self, request: TransferRequest) -> Result<HttpRequest, TransferError> {
        let base = self.session.server_url();
        validate_server_url(&base).map_err(|reason| TransferError::InvalidUrl {
            url: base.clone(),
            reason,
        })?;

        let path = request.path.trim_start_matches('/').to_string();
        let url = format!("{}/{}", base.trim_end_matches('/'), path);

        let mut headers = request.headers;
        if request.authenticated {
            let identity = self
                .session
                .identity()
                .map_err(|e| TransferError::Precondition(e.to_string()))?;
            headers.extend(
                identity
                    .headers()
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value)),
            );
        }

        Ok(HttpRequest {
            method: request.method,
            url,
            path,
            headers,
            body: request.body,
        })
    }

    /// Sends the request, retrying transient failures.
    ///
    /// Returns every received response as-is, including 4xx/5xx.
    pub async fn send(&self, request: TransferRequest) -> Result<TransferResponse, TransferError> {
        let prepared = self.prepare(request)?;
        let span = info_span!("transfer", method = %prepared.method, path = %prepared.path);

        let transport = &self.transport;
        let prepared = &prepared;
        let response = with_retry(&self.policy, &prepared.path, move |attempt| {
            debug!(attempt, "Sending request");
            transport.execute(prepared)
        })
        .instrument(span)
        .await?;

        debug!(
            path = %prepared.path,
            status = response.status().as_u16(),
            "Response received"
        );
        Ok(response)
    }
}
