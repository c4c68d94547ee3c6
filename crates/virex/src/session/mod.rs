//! Session/config gateway: who the caller is and which endpoint to talk to.

pub mod error;
pub mod store;

use secrecy::{ExposeSecret, SecretString};

pub use error::SessionError;
pub use store::SessionStore;

/// Header carrying the numeric user id.
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Header carrying the auth token.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Credentials attached to authenticated requests.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: i64,
    pub token: SecretString,
}

impl Identity {
    pub fn new(user_id: i64, token: impl Into<String>) -> Self {
        Self {
            user_id,
            token: SecretString::from(token.into()),
        }
    }

    /// Header pairs for the service's identity scheme.
    pub fn headers(&self) -> [(&'static str, String); 2] {
        [
            (USER_ID_HEADER, self.user_id.to_string()),
            (AUTH_TOKEN_HEADER, self.token.expose_secret().to_string()),
        ]
    }
}
