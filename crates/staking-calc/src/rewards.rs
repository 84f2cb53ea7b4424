//! Reward projections from a staked principal and an annual rate
//!
//! All rates are simple (non-compounding) APRs expressed in percent.
//! The calendar is fixed at 365 days of 24 hours; no leap-year adjustment
//! and no rounding happens here, only at presentation.

use serde::Serialize;
use std::time::Duration;

use crate::error::clamp_amount;

pub const DAYS_PER_YEAR: f64 = 365.0;
pub const WEEKS_PER_YEAR: f64 = 52.0;
pub const MONTHS_PER_YEAR: f64 = 12.0;
pub const HOURS_PER_DAY: f64 = 24.0;
pub const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Time-sliced reward estimate for one (principal, rate) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardBreakdown {
    pub per_second: f64,
    pub per_hour: f64,
    pub per_day: f64,
    pub per_week: f64,
    pub per_month: f64,
    pub per_year: f64,
}

impl RewardBreakdown {
    /// Rewards earned over an elapsed wall-clock duration (live counter)
    pub fn accrued_over(&self, elapsed: Duration) -> f64 {
        self.per_second * elapsed.as_secs_f64()
    }

    /// Same breakdown valued in fiat at the given asset price
    pub fn in_fiat(&self, price: f64) -> RewardBreakdown {
        let price = clamp_amount(price);
        RewardBreakdown {
            per_second: self.per_second * price,
            per_hour: self.per_hour * price,
            per_day: self.per_day * price,
            per_week: self.per_week * price,
            per_month: self.per_month * price,
            per_year: self.per_year * price,
        }
    }
}

/// Split the yearly reward of `principal` at `annual_rate_percent` into periods.
///
/// Negative, NaN and infinite inputs are treated as zero.
pub fn compute_reward_breakdown(principal: f64, annual_rate_percent: f64) -> RewardBreakdown {
    let per_year = clamp_amount(principal) * clamp_amount(annual_rate_percent) / 100.0;
    let per_day = per_year / DAYS_PER_YEAR;

    RewardBreakdown {
        per_second: per_year / SECONDS_PER_YEAR,
        per_hour: per_day / HOURS_PER_DAY,
        per_day,
        per_week: per_year / WEEKS_PER_YEAR,
        per_month: per_year / MONTHS_PER_YEAR,
        per_year,
    }
}

/// Base APR plus every selected extra APR. Stacking is not capped.
pub fn compute_restaking_total_apr(base_apr: f64, extra_aprs: &[f64]) -> f64 {
    clamp_amount(base_apr) + restaking_bonus_apr(extra_aprs)
}

fn restaking_bonus_apr(extra_aprs: &[f64]) -> f64 {
    extra_aprs.iter().copied().map(clamp_amount).sum()
}

/// Restaking scenario: base staking yield plus the yield of each secured protocol
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestakingProjection {
    pub base_apr: f64,
    pub restaking_apr: f64,
    pub total_apr: f64,
    pub base_yearly: f64,
    pub restaking_yearly: f64,
    pub total_yearly: f64,
    pub breakdown: RewardBreakdown,
}

pub fn project_restaking(principal: f64, base_apr: f64, extra_aprs: &[f64]) -> RestakingProjection {
    let base_apr = clamp_amount(base_apr);
    let restaking_apr = restaking_bonus_apr(extra_aprs);
    let total_apr = compute_restaking_total_apr(base_apr, extra_aprs);

    let base_yearly = compute_reward_breakdown(principal, base_apr).per_year;
    let restaking_yearly = compute_reward_breakdown(principal, restaking_apr).per_year;

    RestakingProjection {
        base_apr,
        restaking_apr,
        total_apr,
        base_yearly,
        restaking_yearly,
        total_yearly: base_yearly + restaking_yearly,
        breakdown: compute_reward_breakdown(principal, total_apr),
    }
}
