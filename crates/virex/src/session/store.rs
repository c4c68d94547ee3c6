use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info, warn};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::error::SessionError;
use super::Identity;
use crate::api::schemas::{AuthResponse, SubscriptionInfo};
use crate::config::{normalize_server_url, validate_server_url};

const DEFAULT_TEMPLATE: &str = "tiktok";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionState {
    #[serde(default)]
    user_id: i64,
    #[serde(default)]
    auth_token: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    is_premium: bool,
    #[serde(default)]
    subscription_expires: i64,
    #[serde(default)]
    total_videos: u32,
    #[serde(default = "default_template")]
    last_template: String,
    #[serde(default)]
    server_url: Option<String>,
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user_id: 0,
            auth_token: None,
            username: None,
            first_name: None,
            is_premium: false,
            subscription_expires: 0,
            total_videos: 0,
            last_template: default_template(),
            server_url: None,
        }
    }
}

/// Persisted identity, entitlement and endpoint settings.
///
/// Backed by a JSON file that is rewritten atomically after every change, or
/// kept purely in memory when no path is given. The file is a few hundred
/// bytes and is written synchronously, also when called from async code.
pub struct SessionStore {
    path: Option<PathBuf>,
    default_server_url: String,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Opens the session file at `path`, starting empty if it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P, default_server_url: &str) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();

        let state = match std::fs::read_to_string(&path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| SessionError::Corrupt {
                    path: path.clone(),
                    source: e,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session file at {:?}, starting signed out", path);
                SessionState::default()
            }
            Err(e) => return Err(SessionError::Load { path, source: e }),
        };

        Ok(Self {
            path: Some(path),
            default_server_url: normalize_server_url(default_server_url),
            state: RwLock::new(state),
        })
    }

    pub fn in_memory(default_server_url: &str) -> Self {
        Self {
            path: None,
            default_server_url: normalize_server_url(default_server_url),
            state: RwLock::new(SessionState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Applies `change` to a copy, persists it, and only then makes it current.
    /// A failed write leaves the in-memory state untouched.
    fn update<F>(&self, change: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = self.write();
        let mut next = state.clone();
        change(&mut next);
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    fn persist(&self, state: &SessionState) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let persist_err = |source| SessionError::Persist {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(persist_err)?;
        }

        let content = serde_json::to_vec_pretty(state).map_err(|e| SessionError::Persist {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(persist_err)?;
        std::fs::rename(&tmp_path, path).map_err(persist_err)?;
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        let state = self.read();
        state.user_id > 0 && state.auth_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Identity for authenticated requests.
    pub fn identity(&self) -> Result<Identity, SessionError> {
        let state = self.read();
        match state.auth_token.as_deref() {
            Some(token) if state.user_id > 0 && !token.is_empty() => Ok(Identity {
                user_id: state.user_id,
                token: SecretString::from(token.to_string()),
            }),
            _ => Err(SessionError::NotAuthenticated),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.read().user_id
    }

    pub fn username(&self) -> Option<String> {
        self.read().username.clone()
    }

    /// First name, then username, then "User".
    pub fn display_name(&self) -> String {
        let state = self.read();
        state
            .first_name
            .clone()
            .or_else(|| state.username.clone())
            .unwrap_or_else(|| "User".to_string())
    }

    pub fn is_premium(&self) -> bool {
        self.read().is_premium
    }

    pub fn subscription_expires(&self) -> i64 {
        self.read().subscription_expires
    }

    pub fn total_videos(&self) -> u32 {
        self.read().total_videos
    }

    pub fn last_template(&self) -> String {
        self.read().last_template.clone()
    }

    pub fn server_url(&self) -> String {
        self.read()
            .server_url
            .clone()
            .unwrap_or_else(|| self.default_server_url.clone())
    }

    /// Stores the identity returned by a successful deep-link sign-in.
    pub fn apply_auth(&self, response: &AuthResponse) -> Result<(), SessionError> {
        let (Some(token), Some(user)) = (response.token.as_ref(), response.user.as_ref()) else {
            warn!("Ignoring auth response without token or user");
            return Err(SessionError::NotAuthenticated);
        };

        self.update(|state| {
            state.user_id = user.id;
            state.auth_token = Some(token.clone());
            state.username = user.username.clone();
            state.first_name = user.first_name.clone();
            state.is_premium = response
                .subscription
                .as_ref()
                .map(|s| s.is_premium)
                .unwrap_or(false);
            if let Some(expires) = response
                .subscription
                .as_ref()
                .and_then(|s| s.subscription.as_ref())
                .and_then(|d| d.expires)
            {
                state.subscription_expires = expires;
            }
        })?;

        info!("Signed in as user {}", user.id);
        Ok(())
    }

    pub fn apply_subscription(&self, info: &SubscriptionInfo) -> Result<(), SessionError> {
        self.update(|state| {
            state.is_premium = info.is_premium;
            state.total_videos = info.total_videos;
            if let Some(expires) = info.subscription.as_ref().and_then(|d| d.expires) {
                state.subscription_expires = expires;
            }
        })
    }

    pub fn record_completed_video(&self) -> Result<(), SessionError> {
        self.update(|state| state.total_videos = state.total_videos.saturating_add(1))
    }

    pub fn set_last_template(&self, template_id: &str) -> Result<(), SessionError> {
        self.update(|state| state.last_template = template_id.to_string())
    }

    /// Validates and stores a new endpoint. Returns the normalized URL.
    pub fn set_server_url(&self, url: &str) -> Result<String, SessionError> {
        let normalized = normalize_server_url(url);
        validate_server_url(&normalized).map_err(|reason| SessionError::InvalidServerUrl {
            url: url.to_string(),
            reason,
        })?;

        self.update(|state| state.server_url = Some(normalized.clone()))?;
        info!("Server URL set to {}", normalized);
        Ok(normalized)
    }

    pub fn reset_server_url(&self) -> Result<(), SessionError> {
        self.update(|state| state.server_url = None)
    }

    /// Clears identity and entitlement. Endpoint, counters and last template survive.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.update(|state| {
            state.user_id = 0;
            state.auth_token = None;
            state.username = None;
            state.first_name = None;
            state.is_premium = false;
            state.subscription_expires = 0;
        })?;
        info!("Signed out");
        Ok(())
    }
}
