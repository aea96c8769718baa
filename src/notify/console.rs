use super::{Alert, NotificationSink};
use crate::error::SinkError;
use crate::status::StatusSummary;
use async_trait::async_trait;
use chrono::Local;

/// Prints alerts to stdout.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }

    fn format_alert(alert: &Alert, at: &str) -> String {
        format!("[{}] {}\n   └─ {}", at, alert.body.replace('\n', " | "), alert.url)
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn send_alert(&self, alert: &Alert) -> Result<(), SinkError> {
        let at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        println!("{}", Self::format_alert(alert, &at));
        Ok(())
    }

    async fn send_status(&self, summary: &StatusSummary) -> Result<(), SinkError> {
        println!("📊 Status update\n{}", summary.render());
        Ok(())
    }
}
