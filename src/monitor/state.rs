//! Mutable state owned by the scheduler loop

use crate::tracker::AvailabilityTracker;
use crate::types::Product;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Polling,
    Reconciling,
    Dispatching,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Polling => "polling",
            Phase::Reconciling => "reconciling",
            Phase::Dispatching => "dispatching",
            Phase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Request counters for status summaries.
#[derive(Debug, Clone)]
pub struct RequestStats {
    pub started_at: DateTime<Utc>,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_check_time: Option<DateTime<Utc>>,
    pub last_check_success: bool,
}

impl RequestStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            successful_requests: 0,
            failed_requests: 0,
            last_check_time: None,
            last_check_success: true,
        }
    }

    pub fn record(&mut self, at: DateTime<Utc>, success: bool) {
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
        self.last_check_time = Some(at);
        self.last_check_success = success;
    }
}

pub struct MonitorState {
    /// Current identity mapping, in configured order.
    pub products: Vec<Product>,
    pub tracker: AvailabilityTracker,
    /// `watch` names of products missing from the last snapshot.
    pub unlisted: HashSet<String>,
    pub stats: RequestStats,
    pub phase: Phase,
}

impl MonitorState {
    pub fn new(products: Vec<Product>, tracker: AvailabilityTracker, now: DateTime<Utc>) -> Self {
        Self {
            products,
            tracker,
            unlisted: HashSet::new(),
            stats: RequestStats::new(now),
            phase: Phase::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_updates_last_check() {
        let start = Utc::now();
        let mut stats = RequestStats::new(start);

        stats.record(start, true);
        stats.record(start + chrono::Duration::seconds(10), false);

        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.failed_requests, 1);
        assert!(!stats.last_check_success);
        assert_eq!(stats.last_check_time, Some(start + chrono::Duration::seconds(10)));
    }
}
