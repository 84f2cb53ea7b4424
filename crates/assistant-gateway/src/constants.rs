//! Centralized constants for the assistant gateway
//!
//! Defaults here can be overridden through the config file or environment;
//! user-facing messages are fixed so no internal detail ever leaks.

// =============================================================================
// Generation Service
// =============================================================================

/// Default generation endpoint (local Ollama)
pub const DEFAULT_OLLAMA_API_URL: &str = "http://localhost:11434/api/generate";

/// Default model name
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Environment variable overriding the generation endpoint
pub const OLLAMA_API_URL_ENV: &str = "OLLAMA_API_URL";

/// Environment variable overriding the model name
pub const OLLAMA_MODEL_ENV: &str = "OLLAMA_MODEL";

/// Hosts the generation endpoint may point at
pub const ALLOWED_UPSTREAM_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

/// Hard deadline for one generation call (ms)
pub const UPSTREAM_TIMEOUT_MS: u64 = 30_000;

/// Sampling options sent with every generation request
pub const GENERATION_TEMPERATURE: f64 = 0.7;
pub const GENERATION_TOP_P: f64 = 0.9;
pub const GENERATION_MAX_TOKENS: u32 = 500;

// =============================================================================
// Throttle
// =============================================================================

/// Requests admitted per client per window
pub const RATE_LIMIT: u32 = 20;

/// Fixed window length (ms)
pub const RATE_WINDOW_MS: u64 = 60_000;

/// How often expired throttle records are swept (s)
pub const RATE_SWEEP_INTERVAL_SECS: u64 = 300;

/// Identifier shared by every client without forwarding headers
pub const UNKNOWN_CLIENT: &str = "unknown";

// =============================================================================
// Input
// =============================================================================

/// Longest accepted user message, in characters
pub const MAX_MESSAGE_LENGTH: usize = 1000;

// =============================================================================
// User-facing Messages
// =============================================================================

pub const MSG_RATE_LIMITED: &str = "Too many requests. Please try again later.";
pub const MSG_INVALID_FORMAT: &str = "Invalid message format";
pub const MSG_INVALID_CONTENT: &str = "Invalid message content";
pub const MSG_MISCONFIGURED: &str = "AI service is not properly configured. Please contact support.";
pub const MSG_TIMEOUT: &str = "The request took too long to process. Please try a shorter question.";
pub const MSG_EMPTY_GENERATION: &str = "I apologize, but I could not generate a response.";

/// Message for an oversized user message
pub fn message_too_long() -> String {
    format!("Message too long. Maximum {} characters.", MAX_MESSAGE_LENGTH)
}

/// Fallback reply when the generation service cannot be reached
pub fn upstream_unavailable(model: &str) -> String {
    format!(
        "I'm having trouble connecting to the AI service. Please make sure Ollama is running on your machine.\n\n\
         To start Ollama:\n\
         1. Install Ollama from https://ollama.ai\n\
         2. Run: ollama pull {}\n\
         3. Make sure Ollama is running (default: http://localhost:11434)",
        model
    )
}

// =============================================================================
// Market Data
// =============================================================================

/// DeFiLlama coin price lookup key for WETH
pub const WETH_PRICE_KEY: &str = "ethereum:0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";

/// DeFiLlama current price endpoint (append coin key)
pub const LLAMA_PRICES_URL: &str = "https://coins.llama.fi/prices/current/";

/// Etherscan gas oracle endpoint
pub const ETHERSCAN_GAS_ORACLE_URL: &str = "https://api.etherscan.io/api?module=gastracker&action=gasoracle";

/// DeFiLlama protocol API base
pub const LLAMA_API_URL: &str = "https://api.llama.fi";

/// DeFiLlama slugs tried for the staking protocol, in order
pub const PROTOCOL_SLUGS: &[&str] = &["etherfi", "ether-fi"];

/// Lowercase name fragments identifying the protocol in the DeFiLlama list
pub const PROTOCOL_NAME_MATCHES: &[&str] = &["ether.fi", "etherfi"];

/// Demo figures served when DeFiLlama is unreachable (USD)
pub const FALLBACK_PROTOCOL_NAME: &str = "ether.fi";
pub const FALLBACK_PROTOCOL_TVL: f64 = 3_200_000_000.0;
pub const FALLBACK_PROTOCOL_FEES_24H: f64 = 120_000.0;
pub const FALLBACK_PROTOCOL_REVENUE_24H: f64 = 95_000.0;

/// Timeout for market data requests (s)
pub const MARKET_TIMEOUT_SECS: u64 = 10;

/// How long a market report is reused before refetching (s)
pub const MARKET_REPORT_TTL_SECS: u64 = 30;
