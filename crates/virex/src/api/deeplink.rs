use thiserror::Error;
use url::Url;

use crate::error::ErrorCategory;

pub const DEEPLINK_SCHEME: &str = "virexpro";
pub const DEEPLINK_HOST: &str = "auth";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeepLinkError {
    #[error("Malformed sign-in link: {0}")]
    Malformed(String),

    #[error("Not a sign-in link: {0}")]
    UnsupportedTarget(String),

    #[error("Sign-in link is missing '{0}'")]
    MissingParameter(&'static str),
}

impl DeepLinkError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::PreconditionFailed
    }
}

/// Sign-in link handed out by the bot: `virexpro://auth?user_id=<id>&code=<code>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    pub user_id: String,
    pub auth_code: String,
}

impl DeepLink {
    pub fn parse(link: &str) -> Result<Self, DeepLinkError> {
        let url = Url::parse(link.trim()).map_err(|e| DeepLinkError::Malformed(e.to_string()))?;

        if url.scheme() != DEEPLINK_SCHEME || url.host_str() != Some(DEEPLINK_HOST) {
            return Err(DeepLinkError::UnsupportedTarget(format!(
                "{}://{}",
                url.scheme(),
                url.host_str().unwrap_or_default()
            )));
        }

        let param = |name: &'static str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(DeepLinkError::MissingParameter(name))
        };

        Ok(Self {
            user_id: param("user_id")?,
            auth_code: param("code")?,
        })
    }
}

impl std::str::FromStr for DeepLink {
    type Err = DeepLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
