//! Chat request pipeline: throttle, validate, compose, generate.

use axum::http::HeaderMap;
use log::{debug, error, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::constants;
use crate::error::{GatewayError, Result};
use crate::prompt::compose_prompt;
use crate::request::ChatRequest;
use crate::sanitize::sanitize;
use crate::throttle::RateLimiter;
use crate::upstream::{Generator, allowed_upstream_url};

/// Client identifier from proxy headers.
///
/// Clients behind a proxy that sets neither header share the `"unknown"` bucket.
pub fn resolve_client_identifier(headers: &HeaderMap) -> String {
    ["x-forwarded-for", "x-real-ip"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(constants::UNKNOWN_CLIENT)
        .to_string()
}

/// Owns the throttle state and the generator for the process lifetime
pub struct Gateway<G: Generator> {
    limiter: Arc<RateLimiter>,
    generator: G,
    upstream_url: String,
    upstream_allowed: bool,
    timeout: Duration,
}

impl<G: Generator> Gateway<G> {
    pub fn new(generator: G, limiter: RateLimiter, upstream_url: impl Into<String>, timeout: Duration) -> Self {
        let upstream_url = upstream_url.into();
        let upstream_allowed = allowed_upstream_url(&upstream_url).is_some();
        if !upstream_allowed {
            warn!("generation endpoint {} is not on the host allow-list; chat requests will fail", upstream_url);
        }

        Self {
            limiter: Arc::new(limiter),
            generator,
            upstream_url,
            upstream_allowed,
            timeout,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Sweep expired throttle records every `every` until the runtime shuts down
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(&self.limiter);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    debug!("swept {} expired rate limit records ({} tracked)", removed, limiter.tracked());
                }
            }
        })
    }

    /// Run one chat request end to end. `body` is the raw JSON payload.
    pub async fn handle_chat_request(&self, client_id: &str, body: &[u8]) -> Result<String> {
        if !self.limiter.check(client_id) {
            warn!("rate limit exceeded for client {}", client_id);
            return Err(GatewayError::RateLimited(client_id.to_string()));
        }

        if !self.upstream_allowed {
            error!("refusing to call non-allow-listed generation endpoint {}", self.upstream_url);
            return Err(GatewayError::Misconfigured(self.upstream_url.clone()));
        }

        let request = ChatRequest::from_json(client_id, body)?;
        self.respond(&request).await
    }

    /// Generate a reply for an already validated request
    pub async fn respond(&self, request: &ChatRequest) -> Result<String> {
        let prompt = compose_prompt(request);
        debug!(
            "generating reply for {} ({} chars, prompt {} chars)",
            request.client_identifier,
            request.sanitized_message.chars().count(),
            prompt.len()
        );

        // Dropping the generation future on timeout cancels the pending request.
        let reply = match tokio::time::timeout(self.timeout, self.generator.generate(&prompt)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                error!("generation failed for {}: {}", request.client_identifier, e);
                return Err(GatewayError::UpstreamUnavailable {
                    model: self.generator.model().to_string(),
                    source: e,
                });
            }
            Err(_) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!("generation timed out after {}ms for {}", timeout_ms, request.client_identifier);
                return Err(GatewayError::Timeout(timeout_ms));
            }
        };

        Ok(sanitize(&reply))
    }
}
