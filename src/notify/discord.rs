//! Discord webhook sink

use super::{require_success, Alert, NotificationSink};
use crate::config::DiscordConfig;
use crate::error::SinkError;
use crate::status::StatusSummary;
use async_trait::async_trait;
use serde_json::{json, Value};

const GREEN: u32 = 0x00ff00;
const BLUE: u32 = 0x0099ff;

pub struct DiscordSink {
    config: DiscordConfig,
    http: reqwest::Client,
}

impl DiscordSink {
    pub fn new(config: DiscordConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    fn payload(&self, content: Option<&str>, embed: Option<Value>) -> Value {
        let mut body = json!({
            "username": self.config.username,
            "content": content,
            "embeds": embed.into_iter().collect::<Vec<_>>(),
        });
        if let Some(avatar) = &self.config.avatar_url {
            body["avatar_url"] = json!(avatar);
        }
        body
    }

    fn alert_payload(&self, alert: &Alert) -> Value {
        let embed = json!({
            "title": alert.title,
            "url": alert.url,
            "color": GREEN,
            "description": format!("✅ IN STOCK: {}\n💰 Price: {}", alert.product, alert.price),
            "fields": [{
                "name": "Links",
                "value": format!("[View Product]({})", alert.url),
                "inline": false,
            }],
        });

        self.payload(self.config.mention.as_deref(), Some(embed))
    }

    async fn post(&self, payload: &Value) -> Result<(), SinkError> {
        let response = self.http.post(&self.config.webhook_url).json(payload).send().await?;
        require_success("discord", &response)
    }
}

#[async_trait]
impl NotificationSink for DiscordSink {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn initialize(&mut self) -> Result<(), SinkError> {
        self.post(&self.payload(Some("🔄 Stock monitor initializing..."), None)).await
    }

    async fn send_alert(&self, alert: &Alert) -> Result<(), SinkError> {
        self.post(&self.alert_payload(alert)).await
    }

    async fn send_status(&self, summary: &StatusSummary) -> Result<(), SinkError> {
        let embed = json!({
            "title": "Stock Monitor Status Update",
            "color": BLUE,
            "description": summary.render(),
        });
        self.post(&self.payload(None, Some(embed))).await
    }

    async fn send_startup(&self, message: &str) -> Result<(), SinkError> {
        let embed = json!({
            "title": "Stock Monitor",
            "description": message,
        });
        self.post(&self.payload(None, Some(embed))).await
    }
}
