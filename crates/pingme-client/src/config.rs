//! Client configuration loaded from environment variables.
//!
//! All settings have defaults so the client can start against a local
//! development backend with zero configuration.

use std::time::Duration;

use pingme_shared::constants::{
    DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TYPING_DEBOUNCE_MS,
};
use pingme_shared::User;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the chat REST routes.
    /// Env: `PINGME_API_URL`
    /// Default: `http://127.0.0.1:8000/api/chat/`
    pub api_url: String,

    /// Bearer access token issued by the auth layer.
    /// Env: `PINGME_TOKEN`
    /// Default: none (unauthenticated requests).
    pub token: Option<String>,

    /// The signed-in user, used to tell own messages apart.
    /// Env: `PINGME_USER_ID`, `PINGME_USERNAME`, `PINGME_DISPLAY_NAME`
    /// Default: id `0`, username `me`.
    pub identity: User,

    /// Idle time after the last keystroke before typing stops.
    /// Env: `PINGME_TYPING_DEBOUNCE_MS`
    /// Default: `1500`
    pub typing_debounce: Duration,

    /// Per-request HTTP timeout.
    /// Env: `PINGME_REQUEST_TIMEOUT_SECS`
    /// Default: `15`
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            identity: User::new(0, "me", "me"),
            typing_debounce: Duration::from_millis(DEFAULT_TYPING_DEBOUNCE_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = var("PINGME_API_URL") {
            config.api_url = url;
        }

        if let Some(token) = var("PINGME_TOKEN") {
            if !token.is_empty() {
                config.token = Some(token);
            }
        }

        if let Some(val) = var("PINGME_USER_ID") {
            match val.parse::<i64>() {
                Ok(id) => config.identity.id = pingme_shared::UserId(id),
                Err(_) => tracing::warn!(value = %val, "Invalid PINGME_USER_ID, using default"),
            }
        }

        if let Some(username) = var("PINGME_USERNAME") {
            config.identity.display_name = username.clone();
            config.identity.username = username;
        }

        if let Some(name) = var("PINGME_DISPLAY_NAME") {
            config.identity.display_name = name;
        }

        if let Some(val) = var("PINGME_TYPING_DEBOUNCE_MS") {
            match val.parse::<u64>() {
                Ok(ms) if ms > 0 => config.typing_debounce = Duration::from_millis(ms),
                _ => tracing::warn!(
                    value = %val,
                    "Invalid PINGME_TYPING_DEBOUNCE_MS, using default"
                ),
            }
        }

        if let Some(val) = var("PINGME_REQUEST_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %val,
                    "Invalid PINGME_REQUEST_TIMEOUT_SECS, using default"
                ),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
