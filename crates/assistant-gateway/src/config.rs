//! Configuration for the assistant gateway

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::constants;
use crate::throttle::RateLimitConfig;

// =============================================================================
// File-based Configuration (gateway.toml)
// =============================================================================

/// Configuration loaded from gateway.toml. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub assistant: AssistantConfig,
    pub rate_limit: RateLimitFileConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. "127.0.0.1:3000"
    pub bind: String,
    /// Origins allowed to call the API cross-origin (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

/// Generation service settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Generation endpoint (OLLAMA_API_URL takes precedence)
    pub api_url: Option<String>,
    /// Model name (OLLAMA_MODEL takes precedence)
    pub model: Option<String>,
    /// Deadline for one generation call in milliseconds
    pub timeout_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            model: None,
            timeout_ms: constants::UPSTREAM_TIMEOUT_MS,
        }
    }
}

/// Throttle settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RateLimitFileConfig {
    /// Requests per client per window
    pub requests: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Interval between sweeps of expired records, in seconds
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitFileConfig {
    fn default() -> Self {
        Self {
            requests: constants::RATE_LIMIT,
            window_ms: constants::RATE_WINDOW_MS,
            sweep_interval_secs: constants::RATE_SWEEP_INTERVAL_SECS,
        }
    }
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| {
            "Invalid gateway config. Check for:\n\
             - Invalid TOML syntax (missing quotes, brackets, etc.)\n\
             - Incorrect data types (strings vs numbers)\n\
             - Misspelled section names ([server], [assistant], [rate_limit])"
        })
    }

    /// Load `path` if given (it must exist), else `default_path` if present, else defaults
    pub fn load_or_default(path: Option<&Path>, default_path: &Path) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if default_path.exists() => Self::load(default_path),
            None => Ok(Self::default()),
        }
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Resolved settings used by the server
#[derive(Debug, Clone)]
pub struct Config {
    /// Listener address
    pub bind: SocketAddr,
    /// Allowed CORS origins
    pub allowed_origins: Vec<String>,
    /// Generation endpoint
    pub api_url: String,
    /// Generation model
    pub model: String,
    /// Generation deadline
    pub upstream_timeout: Duration,
    /// Throttle limit and window
    pub rate_limit: RateLimitConfig,
    /// Throttle sweep interval
    pub sweep_interval: Duration,
}

impl Config {
    /// Combine file config, an optional bind override and environment lookups.
    ///
    /// Precedence: environment, then file, then built-in defaults. The bind
    /// override wins over the file.
    pub fn resolve<F>(file: &FileConfig, bind: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_str = bind.unwrap_or(&file.server.bind);
        let bind: SocketAddr = bind_str
            .parse()
            .with_context(|| format!("Invalid bind address: {}", bind_str))?;

        if file.rate_limit.requests == 0 {
            anyhow::bail!("rate_limit.requests must be at least 1");
        }
        if file.rate_limit.window_ms == 0 {
            anyhow::bail!("rate_limit.window_ms must be greater than 0");
        }
        if file.assistant.timeout_ms == 0 {
            anyhow::bail!("assistant.timeout_ms must be greater than 0");
        }

        let non_empty = |v: String| (!v.trim().is_empty()).then_some(v);

        let api_url = env(constants::OLLAMA_API_URL_ENV)
            .and_then(non_empty)
            .or_else(|| file.assistant.api_url.clone())
            .unwrap_or_else(|| constants::DEFAULT_OLLAMA_API_URL.to_string());

        let model = env(constants::OLLAMA_MODEL_ENV)
            .and_then(non_empty)
            .or_else(|| file.assistant.model.clone())
            .unwrap_or_else(|| constants::DEFAULT_OLLAMA_MODEL.to_string());

        Ok(Self {
            bind,
            allowed_origins: file.server.allowed_origins.clone(),
            api_url,
            model,
            upstream_timeout: Duration::from_millis(file.assistant.timeout_ms),
            rate_limit: RateLimitConfig {
                limit: file.rate_limit.requests,
                window: Duration::from_millis(file.rate_limit.window_ms),
            },
            sweep_interval: Duration::from_secs(file.rate_limit.sweep_interval_secs.max(1)),
        })
    }

    /// Resolve against the process environment
    pub fn from_env(file: &FileConfig, bind: Option<&str>) -> Result<Self> {
        Self::resolve(file, bind, |key| std::env::var(key).ok())
    }
}
