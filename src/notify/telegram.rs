//! Telegram Bot API sink

use super::{require_success, Alert, NotificationSink};
use crate::config::TelegramConfig;
use crate::error::SinkError;
use crate::status::StatusSummary;
use async_trait::async_trait;
use serde_json::json;

pub struct TelegramSink {
    config: TelegramConfig,
    http: reqwest::Client,
}

impl TelegramSink {
    pub fn new(config: TelegramConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    async fn send_message(&self, text: &str) -> Result<(), SinkError> {
        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&json!({
                "chat_id": self.config.chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await?;
        require_success("telegram", &response)
    }
}

/// Escape text for Telegram's HTML parse mode.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn alert_text(alert: &Alert) -> String {
    format!(
        "🔔 {}\n✅ IN STOCK: {}\n💰 Price: {}\n🔗 Link: {}",
        escape_html(&alert.title),
        escape_html(&alert.product),
        escape_html(&alert.price),
        escape_html(&alert.url)
    )
}

#[async_trait]
impl NotificationSink for TelegramSink {
    fn name(&self) -> &'static str {
        "telegram"
    }

    /// Verifies the bot token with `getMe`.
    async fn initialize(&mut self) -> Result<(), SinkError> {
        let response = self.http.get(self.method_url("getMe")).send().await?;
        require_success("telegram", &response)
    }

    async fn send_alert(&self, alert: &Alert) -> Result<(), SinkError> {
        self.send_message(&alert_text(alert)).await
    }

    async fn send_status(&self, summary: &StatusSummary) -> Result<(), SinkError> {
        let text = format!("📊 Stock Monitor Status Update\n{}", escape_html(&summary.render()));
        self.send_message(&text).await
    }

    async fn send_startup(&self, message: &str) -> Result<(), SinkError> {
        self.send_message(&escape_html(message)).await
    }
}
