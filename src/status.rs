//! Periodic health summaries
//!
//! Not stock alerts: these tell the operator the monitor is still polling.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSummary {
    pub runtime: chrono::Duration,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_check_time: Option<DateTime<Utc>>,
    pub last_check_success: bool,
    /// Labels of the tracked products.
    pub monitored: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl StatusSummary {
    pub fn last_check_line(&self) -> String {
        let outcome = if self.last_check_success { "Successful" } else { "Failed" };
        match self.last_check_time {
            Some(at) => {
                let minutes_ago = (self.generated_at - at).num_minutes().max(0);
                format!(
                    "{} ({}m ago) ({})",
                    at.format("%H:%M:%S %d/%m/%Y"),
                    minutes_ago,
                    outcome
                )
            }
            None => "No checks completed".to_string(),
        }
    }

    pub fn monitoring_line(&self) -> String {
        if self.monitored.is_empty() {
            "None".to_string()
        } else {
            self.monitored.join(", ")
        }
    }

    /// Plain-text rendering used by most sinks.
    pub fn render(&self) -> String {
        format!(
            "Running for: {}\nRequests: {} successful, {} failed\nLast check: {}\nMonitoring: {}",
            format_duration(self.runtime),
            self.successful_requests,
            self.failed_requests,
            self.last_check_line(),
            self.monitoring_line()
        )
    }
}

/// "3 hours 7 minutes"
pub fn format_duration(duration: chrono::Duration) -> String {
    let total_minutes = duration.num_minutes().max(0);
    format!("{} hours {} minutes", total_minutes / 60, total_minutes % 60)
}
