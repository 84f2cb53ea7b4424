//! Protocol health score
//!
//! Three signals are graded healthy/warning/critical: the eETH/ETH peg, deposit
//! capacity utilisation and validator uptime. The score starts at 100 and loses
//! points per degraded signal.
//!
//! Zero inputs count as missing, so a zero price keeps the peg at 1.0 and a
//! zero validator count falls back to the default uptime.

use serde::Serialize;

/// Peg ratio band treated as healthy (±0.1%)
pub const PEG_HEALTHY_BAND: f64 = 0.001;
/// Peg ratio band treated as a warning (±0.5%)
pub const PEG_WARNING_BAND: f64 = 0.005;

/// Capacity utilisation thresholds (percent)
pub const CAPACITY_WARNING_PERCENT: f64 = 80.0;
pub const CAPACITY_CRITICAL_PERCENT: f64 = 95.0;

/// Validator uptime thresholds (percent)
pub const UPTIME_HEALTHY_PERCENT: f64 = 99.0;
pub const UPTIME_WARNING_PERCENT: f64 = 95.0;

/// Uptime assumed when validator counts are unknown
pub const DEFAULT_VALIDATOR_UPTIME: f64 = 99.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Warning,
    Critical,
}

impl Status {
    /// (warning, critical) deductions for one signal
    fn deduct(self, warning: u32, critical: u32) -> u32 {
        match self {
            Status::Healthy => 0,
            Status::Warning => warning,
            Status::Critical => critical,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Healthy => write!(f, "Healthy"),
            Status::Warning => write!(f, "Warning"),
            Status::Critical => write!(f, "Critical"),
        }
    }
}

/// Raw protocol figures
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HealthInputs {
    pub eth_price: f64,
    pub eeth_price: Option<f64>,
    pub tvl: f64,
    pub max_capacity: Option<f64>,
    pub total_validators: Option<u32>,
    pub active_validators: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub peg_ratio: f64,
    pub peg_status: Status,
    pub capacity_percent: f64,
    pub capacity_status: Status,
    pub validator_uptime: f64,
    pub validator_status: Status,
    pub score: u32,
    pub label: &'static str,
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

/// eETH price over ETH price, 1.0 when either is missing
pub fn peg_ratio(eth_price: f64, eeth_price: Option<f64>) -> f64 {
    match (present(Some(eth_price)), present(eeth_price)) {
        (Some(eth), Some(eeth)) => eeth / eth,
        _ => 1.0,
    }
}

pub fn peg_status(ratio: f64) -> Status {
    let drift = (ratio - 1.0).abs();
    // Compare with a small tolerance so 0.999 and 1.001 stay inside the band
    if drift <= PEG_HEALTHY_BAND + f64::EPSILON {
        Status::Healthy
    } else if drift <= PEG_WARNING_BAND + f64::EPSILON {
        Status::Warning
    } else {
        Status::Critical
    }
}

/// TVL as a percentage of capacity, 0 when capacity is unknown
pub fn capacity_percent(tvl: f64, max_capacity: Option<f64>) -> f64 {
    present(max_capacity).map_or(0.0, |cap| tvl * 100.0 / cap)
}

pub fn capacity_status(percent: f64) -> Status {
    if percent < CAPACITY_WARNING_PERCENT {
        Status::Healthy
    } else if percent < CAPACITY_CRITICAL_PERCENT {
        Status::Warning
    } else {
        Status::Critical
    }
}

/// Active over total validators in percent, or the default when either count is 0 or missing
pub fn validator_uptime(total: Option<u32>, active: Option<u32>) -> f64 {
    match (total.filter(|t| *t > 0), active.filter(|a| *a > 0)) {
        (Some(total), Some(active)) => f64::from(active) * 100.0 / f64::from(total),
        _ => DEFAULT_VALIDATOR_UPTIME,
    }
}

pub fn validator_status(uptime: f64) -> Status {
    if uptime >= UPTIME_HEALTHY_PERCENT {
        Status::Healthy
    } else if uptime >= UPTIME_WARNING_PERCENT {
        Status::Warning
    } else {
        Status::Critical
    }
}

/// 0-100 score: peg costs 15/40, capacity 10/30, uptime 10/30
pub fn health_score(peg: Status, capacity: Status, validators: Status) -> u32 {
    let deductions = peg.deduct(15, 40) + capacity.deduct(10, 30) + validators.deduct(10, 30);
    100u32.saturating_sub(deductions)
}

pub fn score_label(score: u32) -> &'static str {
    match score {
        90.. => "Excellent",
        80..=89 => "Good",
        70..=79 => "Fair",
        50..=69 => "Poor",
        _ => "Critical",
    }
}

pub fn assess_health(inputs: &HealthInputs) -> HealthReport {
    let peg_ratio = peg_ratio(inputs.eth_price, inputs.eeth_price);
    let capacity_percent = capacity_percent(inputs.tvl, inputs.max_capacity);
    let validator_uptime = validator_uptime(inputs.total_validators, inputs.active_validators);

    let peg_status = peg_status(peg_ratio);
    let capacity_status = capacity_status(capacity_percent);
    let validator_status = validator_status(validator_uptime);
    let score = health_score(peg_status, capacity_status, validator_status);

    HealthReport {
        peg_ratio,
        peg_status,
        capacity_percent,
        capacity_status,
        validator_uptime,
        validator_status,
        score,
        label: score_label(score),
    }
}
