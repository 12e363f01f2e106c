//! Error types for the backend client.

use thiserror::Error;

/// Result type for client setup.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors building a backend client.
///
/// Failures of individual calls are reported as
/// [`fb_reader::ExtensionError`] so the controller can treat them as transient.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No backend URL was configured.
    #[error("no story backend configured (set FABULA_API_URL or pass --api-url)")]
    MissingBaseUrl,

    /// The backend URL is not an http(s) URL.
    #[error("invalid story backend URL: {0}")]
    InvalidBaseUrl(String),

    /// The timeout setting is not a whole number of seconds.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}
