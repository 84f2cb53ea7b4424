//! Staking reward, loyalty-points, restaking and gas-cost projections, plus
//! protocol health scoring and node-operator stake distribution.
//!
//! Everything here is pure: no I/O, no hidden state. Negative or non-finite
//! inputs are clamped to zero; surfaces that take user input should reject
//! them first with [`check_amount`].

pub mod error;
pub mod format;
pub mod gas;
pub mod health;
pub mod loyalty;
pub mod operators;
pub mod restaking;
pub mod rewards;

pub use error::{CalcError, check_amount};
pub use format::{format_currency, format_eth, format_percent, format_usd};
pub use gas::{FALLBACK_ETH_PRICE_USD, GasEstimate, GasPrices, OperationEstimates, estimate_cost};
pub use health::{HealthInputs, HealthReport, Status, assess_health};
pub use loyalty::{
    DEFAULT_TIERS, LoyaltyTier, PointsProjection, compute_points_projection, tier_for, tier_multiplier,
    validate_tiers,
};
pub use operators::{
    DEMO_OPERATORS, NodeOperator, OperatorSummary, StakeAllocation, distribute_stake, summarize_operators,
};
pub use restaking::{BASE_STAKING_APR, PROTOCOLS, RestakingProtocol, extra_aprs_for, unique_selection};
pub use rewards::{
    RestakingProjection, RewardBreakdown, compute_restaking_total_apr, compute_reward_breakdown, project_restaking,
};
