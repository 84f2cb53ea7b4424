//! Error types for calculator inputs and tier tables.

use thiserror::Error;

/// Errors raised when validating caller input before a projection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    /// A numeric input was negative, NaN or infinite.
    #[error("{name} must be a finite, non-negative number (got {value})")]
    InvalidAmount { name: &'static str, value: f64 },

    /// Tier table is not sorted ascending by `min_days`.
    #[error("tier '{tier}' starts at day {min_days}, before the previous tier")]
    TiersOutOfOrder { tier: String, min_days: u32 },

    /// A tier multiplier decreased or dropped below 1.0.
    #[error("tier '{tier}' has invalid multiplier {multiplier}")]
    InvalidMultiplier { tier: String, multiplier: f64 },
}

pub type Result<T> = std::result::Result<T, CalcError>;

/// Reject negative, NaN and infinite amounts
pub fn check_amount(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CalcError::InvalidAmount { name, value })
    }
}

/// Clamp an amount into the calculator's domain (negative/NaN/infinite -> 0)
pub(crate) fn clamp_amount(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { 0.0 }
}
