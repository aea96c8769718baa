use super::{Alert, NotificationSink};
use crate::error::SinkError;
use async_trait::async_trait;
use tokio::process::Command;

/// Opens the product page in the default browser when a product restocks.
pub struct BrowserSink;

impl BrowserSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BrowserSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for BrowserSink {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn send_alert(&self, alert: &Alert) -> Result<(), SinkError> {
        if alert.url.is_empty() {
            return Ok(());
        }

        let status = open_command(&alert.url).status().await?;
        if !status.success() {
            return Err(SinkError::Unavailable(format!(
                "browser launcher exited with {}",
                status
            )));
        }

        log::info!("🌐 Opened {}", alert.url);
        Ok(())
    }
}

fn open_command(url: &str) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", "", url]);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    }
}
