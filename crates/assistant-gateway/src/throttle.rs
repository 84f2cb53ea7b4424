//! Per-client fixed-window request throttle
//!
//! Each client identifier gets a counter and a window end. The first request
//! after the window ends starts a fresh window, so a client can land up to
//! twice the limit in a short burst straddling a boundary.
//!
//! Times come from tokio's clock, which follows paused time in tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::constants;

/// Throttle state for one client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub window_end: Instant,
}

/// Rate limiter configuration
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests admitted per window
    pub limit: u32,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: constants::RATE_LIMIT,
            window: Duration::from_millis(constants::RATE_WINDOW_MS),
        }
    }
}

/// Fixed-window limiter keyed by client identifier.
///
/// Check-and-increment runs under one lock, so concurrent requests from the
/// same client never admit more than `limit` per window.
pub struct RateLimiter {
    config: RateLimitConfig,
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, RateLimitRecord>> {
        // The map holds plain counters; a panic mid-update cannot corrupt it.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if the request is allowed.
    pub fn check(&self, client_id: &str) -> bool {
        self.check_at(client_id, Instant::now())
    }

    /// Same as [`check`](Self::check) with an explicit clock reading
    pub fn check_at(&self, client_id: &str, now: Instant) -> bool {
        let mut records = self.records();

        if let Some(record) = records.get_mut(client_id) {
            if now <= record.window_end {
                if record.count >= self.config.limit {
                    return false;
                }
                record.count += 1;
                return true;
            }
        }

        // First request, or the previous window has ended
        records.insert(
            client_id.to_string(),
            RateLimitRecord {
                count: 1,
                window_end: now + self.config.window,
            },
        );
        true
    }

    /// Drop records whose window has ended. Returns how many were removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut records = self.records();
        let before = records.len();
        records.retain(|_, record| now <= record.window_end);
        before - records.len()
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Number of tracked clients
    pub fn tracked(&self) -> usize {
        self.records().len()
    }

    pub fn record(&self, client_id: &str) -> Option<RateLimitRecord> {
        self.records().get(client_id).copied()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
