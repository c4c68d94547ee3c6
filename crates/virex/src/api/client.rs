//! Typed operations over the service's HTTP surface.

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::deeplink::DeepLink;
use super::schemas::{
    error_message_from_body, AuthRequest, AuthResponse, SubscriptionInfo, TemplatesResponse,
};
use crate::error::Result;
use crate::sanitize::truncate_body;
use crate::transfer::{TransferClient, TransferError, TransferRequest, TransferResponse};

const HEALTH_PATH: &str = "api/health";
const AUTH_PATH: &str = "api/auth/deeplink";
const SUBSCRIPTION_PATH: &str = "api/user/subscription";
const TEMPLATES_PATH: &str = "api/templates";
const VIDEO_INFO_PATH: &str = "api/video/info";

/// Result of a health check that reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: u16,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Clone, Debug)]
pub struct VirexApi {
    client: TransferClient,
}

impl VirexApi {
    pub fn new(client: TransferClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &TransferClient {
        &self.client
    }

    pub async fn health_check(&self) -> Result<HealthStatus> {
        let response = self.client.send(TransferRequest::get(HEALTH_PATH)).await?;
        Ok(HealthStatus {
            status: response.status().as_u16(),
        })
    }

    /// Exchanges a sign-in link for a session and stores it.
    pub async fn authenticate(&self, link: &DeepLink) -> Result<AuthResponse> {
        let body = serde_json::to_value(AuthRequest {
            user_id: link.user_id.clone(),
            auth_code: link.auth_code.clone(),
        })
        .map_err(|e| TransferError::Decode(e.to_string()))?;

        let response = self
            .client
            .send(TransferRequest::post(AUTH_PATH).json(body))
            .await?;
        let status = response.status().as_u16();
        let ok_status = response.is_success();
        let text = response.text().await?;

        match serde_json::from_str::<AuthResponse>(&text) {
            Ok(auth) if ok_status && auth.success => {
                self.client.session().apply_auth(&auth)?;
                Ok(auth)
            }
            parsed => {
                warn!(status, body = %truncate_body(&text), "Sign-in rejected");
                let message = parsed
                    .ok()
                    .and_then(|auth| auth.error)
                    .or_else(|| error_message_from_body(&text))
                    .unwrap_or_else(|| "Authorization failed".to_string());
                Err(TransferError::Rejected { status, message }.into())
            }
        }
    }

    /// Fetches the entitlement snapshot and stores it in the session.
    pub async fn refresh_subscription(&self) -> Result<SubscriptionInfo> {
        let response = self
            .client
            .send(TransferRequest::get(SUBSCRIPTION_PATH).authenticated())
            .await?;
        let info: SubscriptionInfo = expect_success(response).await?.json().await?;

        self.client.session().apply_subscription(&info)?;
        info!(premium = info.is_premium, "Subscription refreshed");
        Ok(info)
    }

    pub async fn fetch_templates(&self) -> Result<TemplatesResponse> {
        let response = self.client.send(TransferRequest::get(TEMPLATES_PATH)).await?;
        Ok(expect_success(response).await?.json().await?)
    }

    /// Server-side metadata for a local video.
    pub async fn video_info(
        &self,
        path: &Path,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        let request = TransferRequest::post(VIDEO_INFO_PATH)
            .authenticated()
            .file_part("video", path);
        let response = self.client.send(request).await?;
        Ok(expect_success(response).await?.json().await?)
    }
}

/// Turns a non-2xx response into [`TransferError::Rejected`].
async fn expect_success(
    response: TransferResponse,
) -> std::result::Result<TransferResponse, TransferError> {
    if response.is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = error_message_from_body(&text).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });
    Err(TransferError::Rejected {
        status: status.as_u16(),
        message,
    })
}
