//! Text-generation service client
//!
//! The gateway talks to the generator through the [`Generator`] trait; the
//! production implementation calls a local Ollama instance.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

use crate::constants;

#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Network or transport failure
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("generation service returned status {0}")]
    Status(u16),

    /// Body was not the expected JSON
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Something that turns a prompt into text
pub trait Generator: Send + Sync + 'static {
    /// Model name, used in user-facing setup instructions
    fn model(&self) -> &str;

    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, UpstreamError>> + Send;
}

/// Returns the parsed URL if its host is on the allow-list
pub fn allowed_upstream_url(url: &str) -> Option<Url> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    constants::ALLOWED_UPSTREAM_HOSTS
        .contains(&host)
        .then_some(parsed)
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
    top_p: f64,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Ollama `/api/generate` client (non-streaming)
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

impl OllamaClient {
    /// The endpoint is always loopback, so system proxies are bypassed.
    pub fn new(api_url: impl Into<String>, model: impl Into<String>) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: reqwest::Client::builder().no_proxy().build()?,
            api_url: api_url.into(),
            model: model.into(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl Generator for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: constants::GENERATION_TEMPERATURE,
                top_p: constants::GENERATION_TOP_P,
                num_predict: constants::GENERATION_MAX_TOKENS,
            },
        };

        let response = self.client.post(&self.api_url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status().as_u16()));
        }

        let text = response.text().await?;
        let data: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        Ok(data
            .response
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| constants::MSG_EMPTY_GENERATION.to_string()))
    }
}
