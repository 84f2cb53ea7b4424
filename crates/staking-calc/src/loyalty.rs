//! Loyalty tiers and points projections
//!
//! Points accrue at one point per staked unit per day. Staying staked past a
//! tier threshold multiplies the daily rate.

use serde::Serialize;

use crate::error::{CalcError, Result, clamp_amount};

/// A staking-duration threshold unlocking a points multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyTier {
    pub name: &'static str,
    pub min_days: u32,
    pub multiplier: f64,
}

/// Tier table used by the demo dashboard. Sorted ascending by `min_days`.
pub const DEFAULT_TIERS: &[LoyaltyTier] = &[
    LoyaltyTier { name: "Bronze", min_days: 0, multiplier: 1.0 },
    LoyaltyTier { name: "Silver", min_days: 30, multiplier: 1.2 },
    LoyaltyTier { name: "Gold", min_days: 90, multiplier: 1.5 },
    LoyaltyTier { name: "Platinum", min_days: 180, multiplier: 2.0 },
    LoyaltyTier { name: "Diamond", min_days: 365, multiplier: 2.5 },
];

/// Demo conversion assumptions for the "what if points become tokens" panel
pub const DEMO_POINTS_PER_TOKEN: f64 = 1.0;
pub const DEMO_TOKEN_PRICE_USD: f64 = 2.5;

/// Last tier whose `min_days` is at or below `days`.
///
/// A later matching entry wins over an earlier one, even in an unsorted table.
pub fn tier_for(days: u32, tiers: &[LoyaltyTier]) -> Option<&LoyaltyTier> {
    tiers.iter().rev().find(|tier| tier.min_days <= days)
}

/// Multiplier for a staking duration; 1.0 when no tier qualifies
pub fn tier_multiplier(days: u32, tiers: &[LoyaltyTier]) -> f64 {
    tier_for(days, tiers).map_or(1.0, |tier| tier.multiplier)
}

/// Check that a tier table is ordered and its multipliers never decrease
pub fn validate_tiers(tiers: &[LoyaltyTier]) -> Result<()> {
    let mut previous: Option<&LoyaltyTier> = None;

    for tier in tiers {
        if !tier.multiplier.is_finite() || tier.multiplier < 1.0 {
            return Err(CalcError::InvalidMultiplier {
                tier: tier.name.to_string(),
                multiplier: tier.multiplier,
            });
        }
        if let Some(prev) = previous {
            if tier.min_days < prev.min_days {
                return Err(CalcError::TiersOutOfOrder {
                    tier: tier.name.to_string(),
                    min_days: tier.min_days,
                });
            }
            if tier.multiplier < prev.multiplier {
                return Err(CalcError::InvalidMultiplier {
                    tier: tier.name.to_string(),
                    multiplier: tier.multiplier,
                });
            }
        }
        previous = Some(tier);
    }

    Ok(())
}

/// Daily points rates and the total after staying staked for the duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsProjection {
    pub multiplier: f64,
    pub base_rate_per_day: f64,
    pub bonus_rate_per_day: f64,
    pub total_rate_per_day: f64,
    pub projected_total: f64,
}

impl PointsProjection {
    /// Hypothetical fiat value if points were converted to tokens
    pub fn hypothetical_value(&self, points_per_token: f64, token_price: f64) -> f64 {
        self.projected_total * clamp_amount(points_per_token) * clamp_amount(token_price)
    }
}

pub fn compute_points_projection(
    current_points: f64,
    principal: f64,
    duration_days: u32,
    tiers: &[LoyaltyTier],
) -> PointsProjection {
    let multiplier = tier_multiplier(duration_days, tiers);
    let base_rate_per_day = clamp_amount(principal);
    let bonus_rate_per_day = base_rate_per_day * (multiplier - 1.0);
    let total_rate_per_day = base_rate_per_day + bonus_rate_per_day;

    PointsProjection {
        multiplier,
        base_rate_per_day,
        bonus_rate_per_day,
        total_rate_per_day,
        projected_total: clamp_amount(current_points) + total_rate_per_day * f64::from(duration_days),
    }
}
