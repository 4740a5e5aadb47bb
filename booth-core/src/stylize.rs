//! Client seam to the external generative-image service.
//!
//! The service is consumed as a black box: submit one frame plus a prompt,
//! receive the stylized frame. The core never retries; retry is a
//! user-initiated re-capture.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{BoothError, BoothResult, PhotoId};

/// Submits a captured frame + prompt for stylization. One outstanding call
/// per photo.
#[async_trait]
pub trait Stylizer: Send + Sync {
    async fn submit(&self, photo_id: &PhotoId, image: Bytes, prompt: &str) -> BoothResult<Bytes>;
}

/// Configuration for the HTTP stylization client
#[derive(Debug, Clone)]
pub struct StylizerConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// Request timeout. The upstream service enforces none of its own, so
    /// slow networks would otherwise hang the session.
    pub timeout: Duration,
}

impl StylizerConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: "image-stylize-preview".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// reqwest-backed [`Stylizer`] posting base64 frames as JSON
pub struct HttpStylizer {
    client: reqwest::Client,
    config: StylizerConfig,
}

#[derive(Serialize)]
struct StylizeRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    image: String,
}

#[derive(Deserialize)]
struct StylizeResponse {
    image: String,
}

impl HttpStylizer {
    pub fn new(config: StylizerConfig) -> BoothResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BoothError::stylization(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Stylizer for HttpStylizer {
    async fn submit(&self, photo_id: &PhotoId, image: Bytes, prompt: &str) -> BoothResult<Bytes> {
        tracing::debug!(photo_id = %photo_id, prompt_len = prompt.len(), "submitting frame for stylization");

        let body = StylizeRequest {
            model: &self.config.model,
            prompt,
            image: BASE64.encode(&image),
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BoothError::stylization(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BoothError::stylization(format!(
                "service returned {}",
                response.status()
            )));
        }

        let parsed: StylizeResponse = response
            .json()
            .await
            .map_err(|e| BoothError::stylization(e.to_string()))?;

        let decoded = BASE64
            .decode(parsed.image)
            .map_err(|e| BoothError::stylization(format!("undecodable response image: {e}")))?;

        Ok(Bytes::from(decoded))
    }
}
