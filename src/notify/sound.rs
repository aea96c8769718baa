use super::{Alert, NotificationSink};
use crate::error::SinkError;
use async_trait::async_trait;

/// Audible cue on restock.
pub struct SoundSink;

impl SoundSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SoundSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for SoundSink {
    fn name(&self) -> &'static str {
        "sound"
    }

    async fn send_alert(&self, _alert: &Alert) -> Result<(), SinkError> {
        play().await
    }
}

#[cfg(target_os = "macos")]
async fn play() -> Result<(), SinkError> {
    let status = tokio::process::Command::new("afplay")
        .arg("/System/Library/Sounds/Glass.aiff")
        .status()
        .await?;
    check(status)
}

#[cfg(target_os = "windows")]
async fn play() -> Result<(), SinkError> {
    let status = tokio::process::Command::new("powershell")
        .args(["-NoProfile", "-Command", "[console]::beep(1000,500)"])
        .status()
        .await?;
    check(status)
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
async fn play() -> Result<(), SinkError> {
    use std::io::Write;

    // Terminal bell
    let mut out = std::io::stdout();
    out.write_all(b"\x07")?;
    out.flush()?;
    Ok(())
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn check(status: std::process::ExitStatus) -> Result<(), SinkError> {
    if status.success() {
        Ok(())
    } else {
        Err(SinkError::Unavailable(format!("sound player exited with {}", status)))
    }
}
