//! Transaction cost estimates for the dashboard's staking operations

use serde::{Deserialize, Serialize};

/// Typical gas limits per operation
pub const STAKE_GAS_LIMIT: u64 = 150_000;
pub const UNSTAKE_GAS_LIMIT: u64 = 100_000;
pub const WRAP_GAS_LIMIT: u64 = 80_000;
pub const CLAIM_GAS_LIMIT: u64 = 60_000;

/// Used when no live ETH price is available
pub const FALLBACK_ETH_PRICE_USD: f64 = 2500.0;

const GWEI_PER_ETH: f64 = 1e9;

/// Cost of one operation in ETH, USD and the gas price it was computed at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasEstimate {
    pub eth: f64,
    pub usd: f64,
    pub gwei: f64,
}

/// Gas price tiers in gwei
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasPrices {
    pub slow: f64,
    pub standard: f64,
    pub fast: f64,
}

impl Default for GasPrices {
    fn default() -> Self {
        Self {
            slow: 25.0,
            standard: 30.0,
            fast: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationEstimates {
    pub stake: GasEstimate,
    pub unstake: GasEstimate,
    pub wrap: GasEstimate,
    pub claim: GasEstimate,
}

impl OperationEstimates {
    /// Estimate every operation at one gas price
    pub fn at(gas_price_gwei: f64, eth_price_usd: f64) -> Self {
        Self {
            stake: estimate_cost(STAKE_GAS_LIMIT, gas_price_gwei, eth_price_usd),
            unstake: estimate_cost(UNSTAKE_GAS_LIMIT, gas_price_gwei, eth_price_usd),
            wrap: estimate_cost(WRAP_GAS_LIMIT, gas_price_gwei, eth_price_usd),
            claim: estimate_cost(CLAIM_GAS_LIMIT, gas_price_gwei, eth_price_usd),
        }
    }
}

/// ETH cost is rounded to 6 decimals, USD to 2 (USD uses the unrounded ETH cost)
pub fn estimate_cost(gas_limit: u64, gas_price_gwei: f64, eth_price_usd: f64) -> GasEstimate {
    let cost_eth = gas_limit as f64 * gas_price_gwei / GWEI_PER_ETH;
    GasEstimate {
        eth: round_to(cost_eth, 6),
        usd: round_to(cost_eth * eth_price_usd, 2),
        gwei: gas_price_gwei,
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
