//! Demo node-operator set and stake distribution
//!
//! Stake is split evenly across active operators only.

use serde::Serialize;

use crate::error::clamp_amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeOperator {
    pub id: u32,
    pub name: &'static str,
    pub location: &'static str,
    pub validators: u32,
    pub uptime: f64,
    pub status: OperatorStatus,
}

impl NodeOperator {
    pub fn is_active(&self) -> bool {
        self.status == OperatorStatus::Active
    }
}

const fn operator(
    id: u32,
    name: &'static str,
    location: &'static str,
    validators: u32,
    uptime: f64,
    status: OperatorStatus,
) -> NodeOperator {
    NodeOperator {
        id,
        name,
        location,
        validators,
        uptime,
        status,
    }
}

pub const DEMO_OPERATORS: &[NodeOperator] = &[
    operator(1, "StakeWise US", "USA", 12, 99.8, OperatorStatus::Active),
    operator(2, "EuroNode", "Germany", 8, 99.5, OperatorStatus::Active),
    operator(3, "AsiaStake", "Singapore", 10, 99.9, OperatorStatus::Active),
    operator(4, "CanadaVal", "Canada", 6, 99.2, OperatorStatus::Active),
    operator(5, "UKValidator", "UK", 9, 99.7, OperatorStatus::Active),
    operator(6, "AussieNode", "Australia", 7, 98.9, OperatorStatus::Inactive),
    operator(7, "JapanStake", "Japan", 11, 99.6, OperatorStatus::Active),
    operator(8, "SwissNode", "Switzerland", 5, 99.4, OperatorStatus::Active),
];

/// One operator's share of the user's stake
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeAllocation {
    pub operator_id: u32,
    pub amount: f64,
}

/// Even split of `stake` over active operators, each share rounded to 4 dp.
///
/// Returns nothing when no operator is active.
pub fn distribute_stake(stake: f64, operators: &[NodeOperator]) -> Vec<StakeAllocation> {
    let active: Vec<&NodeOperator> = operators.iter().filter(|op| op.is_active()).collect();
    if active.is_empty() {
        return Vec::new();
    }

    let share = clamp_amount(stake) / active.len() as f64;
    let amount = (share * 10_000.0).round() / 10_000.0;

    active
        .into_iter()
        .map(|op| StakeAllocation {
            operator_id: op.id,
            amount,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSummary {
    pub total_operators: usize,
    pub total_validators: u32,
    pub active_validators: u32,
    /// Mean uptime over every operator, active or not
    pub average_uptime: f64,
}

pub fn summarize_operators(operators: &[NodeOperator]) -> OperatorSummary {
    let average_uptime = if operators.is_empty() {
        0.0
    } else {
        operators.iter().map(|op| op.uptime).sum::<f64>() / operators.len() as f64
    };

    OperatorSummary {
        total_operators: operators.len(),
        total_validators: operators.iter().map(|op| op.validators).sum(),
        active_validators: operators
            .iter()
            .filter(|op| op.is_active())
            .map(|op| op.validators)
            .sum(),
        average_uptime,
    }
}
