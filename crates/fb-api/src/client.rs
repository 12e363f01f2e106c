//! HTTP implementation of [`StoryBackend`].

use async_trait::async_trait;
use fb_core::StoryMetadata;
use fb_reader::{Extension, ExtensionError, ExtensionRequest, Opening, StoryBackend};
use reqwest::{Client, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::wire::{ContinueRequest, ContinueResponse, StartRequest, StartResponse};

/// Story backend reached over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpStoryBackend {
    client: Client,
    base: Url,
}

impl HttpStoryBackend {
    /// Build a client for `config`.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(config.base_url.clone()));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post<T, R>(&self, url: Url, body: &T) -> Result<R, ExtensionError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(%url, "story backend request");
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            warn!(%url, status = status.as_u16(), "story backend error");
            return Err(ExtensionError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(transport_error)
    }
}

fn transport_error(err: reqwest::Error) -> ExtensionError {
    if err.is_timeout() {
        ExtensionError::Timeout
    } else if err.is_decode() {
        ExtensionError::InvalidResponse(err.to_string())
    } else {
        ExtensionError::Network(err.to_string())
    }
}

#[async_trait]
impl StoryBackend for HttpStoryBackend {
    async fn start(&self, metadata: &StoryMetadata) -> Result<Opening, ExtensionError> {
        let url = self.endpoint(&["stories"]);
        let response: StartResponse = self.post(url, &StartRequest { metadata }).await?;
        response.try_into()
    }

    async fn extend(&self, request: &ExtensionRequest) -> Result<Extension, ExtensionError> {
        let url = self.endpoint(&["stories", request.session_id.as_str(), "continue"]);
        let response: ContinueResponse =
            self.post(url, &ContinueRequest::from(request)).await?;
        response.try_into()
    }
}
