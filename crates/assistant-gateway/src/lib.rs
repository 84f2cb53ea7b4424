//! Rate-limited chat gateway for the liquid-staking demo
//!
//! Throttles clients, validates and sanitizes messages, builds a staking-aware
//! prompt and forwards it to a local text-generation service under a hard
//! deadline. Also serves the calculator and gas-price lookups over HTTP.

pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod market;
pub mod prompt;
pub mod request;
pub mod routes;
pub mod sanitize;
pub mod throttle;
pub mod upstream;

pub use config::{Config, FileConfig};
pub use error::GatewayError;
pub use gateway::{Gateway, resolve_client_identifier};
pub use market::{GasPriceReport, MarketClient, ProtocolSnapshot};
pub use routes::{AppState, cors_layer, router};
pub use sanitize::sanitize;
pub use throttle::{RateLimitConfig, RateLimiter};
pub use upstream::{Generator, OllamaClient, UpstreamError};
