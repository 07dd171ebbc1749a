use std::env;
use std::time::Duration;

use crate::errors::HuddleError;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-05-20";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_CHANNEL: &str = "general";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Pre-provisioned custom token tried before anonymous sign-in.
    pub initial_auth_token: Option<String>,
    pub default_channel: String,
    pub http_timeout: Duration,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns `Config` if a required variable is missing or a value does not parse.
    pub fn from_env() -> Result<Self, HuddleError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a required variable is missing or a value does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HuddleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let http_timeout = match get("HUDDLE_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    HuddleError::Config(format!("HUDDLE_HTTP_TIMEOUT_SECS: {e}"))
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY")
                .ok_or_else(|| HuddleError::Config("GEMINI_API_KEY: not set".to_string()))?,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            initial_auth_token: get("HUDDLE_AUTH_TOKEN"),
            default_channel: get("HUDDLE_CHANNEL").unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
            http_timeout,
        })
    }
}
