//! Demo restaking catalogue
//!
//! Each protocol secured with restaked ETH adds its own APR on top of the
//! base staking rate.

use serde::Serialize;

/// Base liquid-staking APR used by the demo
pub const BASE_STAKING_APR: f64 = 3.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Risk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Risk::Low => write!(f, "low"),
            Risk::Medium => write!(f, "medium"),
            Risk::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RestakingProtocol {
    pub id: u32,
    pub name: &'static str,
    pub category: &'static str,
    pub apr: f64,
    pub risk: Risk,
}

pub const PROTOCOLS: &[RestakingProtocol] = &[
    RestakingProtocol { id: 1, name: "DataLayer", category: "Data Availability", apr: 2.5, risk: Risk::Low },
    RestakingProtocol { id: 2, name: "OracleNet", category: "Oracle Network", apr: 3.2, risk: Risk::Medium },
    RestakingProtocol { id: 3, name: "BridgeGuard", category: "Bridge Security", apr: 4.1, risk: Risk::Medium },
    RestakingProtocol { id: 4, name: "ZK-Prover", category: "ZK Computation", apr: 5.0, risk: Risk::High },
];

/// Protocols preselected on the dashboard
pub const DEFAULT_SELECTION: &[u32] = &[1, 2];

pub fn find_protocol(id: u32) -> Option<&'static RestakingProtocol> {
    PROTOCOLS.iter().find(|p| p.id == id)
}

/// Selected ids as a set, in first-seen order
pub fn unique_selection(ids: &[u32]) -> Vec<u32> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    unique
}

/// Extra APR for each selected protocol. Repeated ids count once; unknown ids contribute 0.
pub fn extra_aprs_for(ids: &[u32]) -> Vec<f64> {
    unique_selection(ids)
        .into_iter()
        .map(|id| find_protocol(id).map_or(0.0, |p| p.apr))
        .collect()
}
