//! Wire types exchanged with the processing service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest {
    pub user_id: String,
    pub auth_code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub subscription: Option<SubscriptionInfo>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionInfo {
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default = "default_plan")]
    pub plan: Option<String>,
    #[serde(default)]
    pub subscription: Option<SubscriptionDetails>,
    #[serde(default)]
    pub videos_today: u32,
    #[serde(default)]
    pub total_videos: u32,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// Upload limit in megabytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_plan() -> Option<String> {
    Some("free".to_string())
}

fn default_daily_limit() -> u32 {
    3
}

fn default_max_file_size() -> u64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionDetails {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Expiry as a unix timestamp.
    #[serde(default)]
    pub expires: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesResponse {
    pub templates: Vec<TemplateItem>,
    #[serde(default)]
    pub categories: Option<Vec<CategoryItem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "is_premium")]
    pub is_premium: bool,
    #[serde(default)]
    pub effects: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryItem {
    pub id: String,
    pub name: String,
}

/// Body shape the service uses for JSON error replies.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.error.or(self.message).or(self.detail)
    }
}

/// Human-readable message from an error response body: the JSON `error`,
/// `message` or `detail` field, else the raw text. `None` when empty.
pub(crate) fn error_message_from_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(parsed) => parsed.into_message().filter(|m| !m.trim().is_empty()),
        Err(_) => Some(trimmed.to_string()),
    }
}
