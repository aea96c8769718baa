//! ntfy sink
//!
//! Publishes JSON to the server root with the topic in the body, which lets
//! one request carry title, tags, click URL and actions.

use super::{require_success, Alert, NotificationSink};
use crate::config::NtfyConfig;
use crate::error::SinkError;
use crate::status::StatusSummary;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct NtfySink {
    config: NtfyConfig,
    http: reqwest::Client,
}

impl NtfySink {
    pub fn new(config: NtfyConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    fn alert_payload(&self, alert: &Alert) -> Value {
        json!({
            "topic": self.config.topic,
            "title": alert.title,
            "message": format!("IN STOCK: {}\nPrice: {}", alert.product, alert.price),
            "priority": 4,
            "tags": ["stock", "alert", "instock"],
            "click": alert.url,
            "actions": [{
                "action": "view",
                "label": "View Product",
                "url": alert.url,
            }],
        })
    }

    async fn publish(&self, payload: &Value) -> Result<(), SinkError> {
        let mut request = self
            .http
            .post(self.config.server_url.trim_end_matches('/'))
            .json(payload);

        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        } else if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await?;
        require_success("ntfy", &response)
    }
}

/// ntfy's JSON API takes priorities as 1 (min) to 5 (max).
fn priority_level(name: &str) -> u8 {
    match name {
        "min" => 1,
        "low" => 2,
        "high" => 4,
        "max" | "urgent" => 5,
        _ => 3,
    }
}

#[async_trait]
impl NotificationSink for NtfySink {
    fn name(&self) -> &'static str {
        "ntfy"
    }

    async fn initialize(&mut self) -> Result<(), SinkError> {
        self.publish(&json!({
            "topic": self.config.topic,
            "message": "Initializing connection",
            "priority": 1,
            "tags": ["test"],
        }))
        .await
    }

    async fn send_alert(&self, alert: &Alert) -> Result<(), SinkError> {
        self.publish(&self.alert_payload(alert)).await
    }

    async fn send_status(&self, summary: &StatusSummary) -> Result<(), SinkError> {
        self.publish(&json!({
            "topic": self.config.topic,
            "title": "Stock Monitor Status",
            "message": summary.render(),
            "priority": 2,
            "tags": ["status", "update"],
        }))
        .await
    }

    async fn send_startup(&self, message: &str) -> Result<(), SinkError> {
        self.publish(&json!({
            "topic": self.config.topic,
            "title": "Stock Monitor",
            "message": message,
            "priority": priority_level(&self.config.priority),
            "tags": ["startup"],
        }))
        .await
    }
}
