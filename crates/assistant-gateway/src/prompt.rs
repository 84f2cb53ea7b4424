//! Prompt assembly for the staking assistant

use crate::request::{ChatRequest, ProtocolContext, UserContext};

/// Demo portfolio shown when the caller sends no user context
pub const DEFAULT_STAKED_ETH: f64 = 10.5;
pub const DEFAULT_EETH_BALANCE: f64 = 10.52;
pub const DEFAULT_TOTAL_REWARDS: f64 = 0.15;
pub const DEFAULT_APY: f64 = 3.8;

const NOT_AVAILABLE: &str = "N/A";

const CAPABILITIES: &str = "YOUR CAPABILITIES:
1. Explain how ether.fi staking works
2. Calculate projected earnings based on staking amount and APY
3. Explain what eETH and weETH tokens are
4. Help users understand their staking rewards
5. Provide insights on staking strategies

WHEN USER ASKS ABOUT PROJECTIONS:
- Use the current APY (~3.8%) for calculations
- Calculate: (staking_amount * APY / 100) = annual_rewards
- Break down into monthly, weekly, daily earnings
- Consider compound interest if applicable
- Example: If user asks \"How much could I earn if I stake 20 ETH?\"
  - Annual: 20 * 0.038 = 0.76 ETH
  - Monthly: 0.76 / 12 = 0.063 ETH
  - Weekly: 0.76 / 52 = 0.015 ETH
  - Daily: 0.76 / 365 = 0.002 ETH

Be friendly, accurate, and educational. Always use the real protocol data when available. Keep responses concise and helpful.";

/// Zero is treated like a missing value
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

fn scaled(value: Option<f64>, divisor: f64, suffix: &str) -> String {
    present(value).map_or_else(
        || NOT_AVAILABLE.to_string(),
        |v| format!("${:.2}{}", v / divisor, suffix),
    )
}

fn or_default(value: Option<f64>, default: f64) -> f64 {
    present(value).unwrap_or(default)
}

/// Protocol section of the prompt
pub fn protocol_section(protocol: &ProtocolContext) -> String {
    format!(
        "REAL-TIME PROTOCOL DATA:
- Total Value Locked (TVL): {}
- 24h Fees: {}
- 24h Revenue: {}
- Current APY: ~{}%",
        scaled(protocol.tvl, 1e9, "B"),
        scaled(protocol.fees_24h, 1e6, "M"),
        scaled(protocol.revenue_24h, 1e6, "M"),
        DEFAULT_APY,
    )
}

/// User section of the prompt, falling back to the demo portfolio
pub fn user_section(user: &UserContext) -> String {
    format!(
        "USER CONTEXT (DEMO):
- Staked ETH: {} ETH
- eETH Balance: {} eETH
- Total Rewards: {} ETH
- Current APY: {}%",
        or_default(user.staked_eth, DEFAULT_STAKED_ETH),
        or_default(user.eeth_balance, DEFAULT_EETH_BALANCE),
        or_default(user.total_rewards, DEFAULT_TOTAL_REWARDS),
        or_default(user.apy, DEFAULT_APY),
    )
}

/// Full prompt sent to the generation service
pub fn compose_prompt(request: &ChatRequest) -> String {
    format!(
        "You are an AI assistant for ether.fi, a non-custodial Ethereum staking platform.\n\n\
         {}\n\n{}\n\n{}\n\nUser Question: {}\n\nAssistant:",
        protocol_section(&request.protocol),
        user_section(&request.user),
        CAPABILITIES,
        request.sanitized_message,
    )
}
