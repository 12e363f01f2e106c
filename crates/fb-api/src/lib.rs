//! HTTP client for the Fabula story backend.
//!
//! [`HttpStoryBackend`] implements [`fb_reader::StoryBackend`] over two JSON
//! endpoints, `POST /stories` and `POST /stories/{id}/continue`. Responses
//! are converted into the validated `fb-core` model in [`wire`].

pub mod client;
pub mod config;
pub mod error;
pub mod wire;

pub use client::HttpStoryBackend;
pub use config::{ApiConfig, ENV_API_TIMEOUT, ENV_API_URL};
pub use error::{ApiError, ApiResult};
