//! Gateway error taxonomy and its HTTP mapping.
//!
//! Every variant renders as a fixed, friendly message. Chat-facing failures use
//! a `response` field so the UI can show them like a normal assistant reply.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

use crate::constants;
use crate::upstream::UpstreamError;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing, malformed, oversized or empty message. Holds the user-facing text.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Client exceeded its request budget for the current window.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Generation did not finish before the deadline.
    #[error("upstream timed out after {0}ms")]
    Timeout(u64),

    /// Generation service returned an error or could not be reached.
    #[error("upstream unavailable: {source}")]
    UpstreamUnavailable {
        model: String,
        #[source]
        source: UpstreamError,
    },

    /// Generation endpoint is not on the host allow-list.
    #[error("misconfigured upstream: {0}")]
    Misconfigured(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamUnavailable { .. } | GatewayError::Misconfigured(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// User-safe JSON body
    pub fn body(&self) -> Value {
        match self {
            GatewayError::InvalidInput(message) => json!({ "error": message }),
            GatewayError::RateLimited(_) => json!({ "error": constants::MSG_RATE_LIMITED }),
            GatewayError::Timeout(_) => json!({ "response": constants::MSG_TIMEOUT }),
            GatewayError::UpstreamUnavailable { model, .. } => {
                json!({ "response": constants::upstream_unavailable(model) })
            }
            GatewayError::Misconfigured(_) => json!({ "response": constants::MSG_MISCONFIGURED }),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::InvalidInput("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::RateLimited("a".into()).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(GatewayError::Timeout(30_000).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            GatewayError::Misconfigured("example.com".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_bodies_do_not_leak_internals() {
        let err = GatewayError::UpstreamUnavailable {
            model: "llama3.2".to_string(),
            source: UpstreamError::Status(502),
        };
        let body = err.body();
        let text = body["response"].as_str().unwrap();
        assert!(text.contains("ollama pull llama3.2"));
        assert!(!text.contains("502"));
        assert!(body.get("error").is_none());

        let err = GatewayError::Misconfigured("evil.example.com".to_string());
        assert!(!err.body().to_string().contains("evil.example.com"));
    }

    #[test]
    fn test_client_errors_use_error_field() {
        let body = GatewayError::InvalidInput(constants::MSG_INVALID_FORMAT.to_string()).body();
        assert_eq!(body["error"], constants::MSG_INVALID_FORMAT);

        let body = GatewayError::RateLimited("10.0.0.1".to_string()).body();
        assert_eq!(body["error"], constants::MSG_RATE_LIMITED);
        assert!(!body.to_string().contains("10.0.0.1"));
    }
}
