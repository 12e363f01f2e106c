//! Backend client configuration.

use std::env;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

/// Environment variable holding the backend base URL.
pub const ENV_API_URL: &str = "FABULA_API_URL";
/// Environment variable holding the request timeout in seconds.
pub const ENV_API_TIMEOUT: &str = "FABULA_API_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where and how to reach the story backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL, without a trailing slash.
    pub base_url: String,
    /// Per-request deadline.
    pub timeout: Duration,
}

impl ApiConfig {
    /// Configure a backend at `base_url` with the default timeout.
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::MissingBaseUrl);
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(base_url));
        }
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the configuration from `FABULA_API_URL` and `FABULA_API_TIMEOUT_SECS`.
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        let base_url = lookup(ENV_API_URL).ok_or(ApiError::MissingBaseUrl)?;
        let config = Self::new(base_url)?;
        match lookup(ENV_API_TIMEOUT) {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ApiError::InvalidTimeout(raw.clone()))?;
                Ok(config.with_timeout(Duration::from_secs(secs)))
            }
            None => Ok(config),
        }
    }
}
