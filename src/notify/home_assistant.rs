//! Home Assistant `notify` service sink

use super::{require_success, Alert, NotificationSink};
use crate::config::HomeAssistantConfig;
use crate::error::SinkError;
use crate::status::StatusSummary;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct HomeAssistantSink {
    config: HomeAssistantConfig,
    http: reqwest::Client,
}

impl HomeAssistantSink {
    pub fn new(config: HomeAssistantConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn alert_payload(&self, alert: &Alert) -> Value {
        let tag: String = alert
            .product
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();

        let mut data = json!({
            "url": alert.url,
            "tag": format!("stock_{}", tag),
            "color": "#00ff00",
            "priority": "high",
            "sticky": true,
            "actions": [{
                "action": "URI",
                "title": "View Product",
                "uri": alert.url,
            }],
        });

        if self.config.critical_alerts {
            data["critical"] = json!(true);
            data["interruption-level"] = json!("critical");
            data["push"] = json!({
                "sound": {
                    "name": "default",
                    "volume": self.config.critical_volume,
                    "critical": 1,
                },
                "priority": "high",
                "ttl": 0,
                "importance": "high",
                "channel": "critical_alerts",
            });
        } else {
            data["push"] = json!({
                "sound": "default",
                "priority": "normal",
                "importance": "default",
                "channel": "stock_alerts",
            });
        }

        json!({
            "title": alert.title,
            "message": format!("IN STOCK: {}\nPrice: {}", alert.product, alert.price),
            "data": data,
        })
    }

    fn plain_payload(title: &str, message: &str, tag: &str) -> Value {
        json!({
            "title": title,
            "message": message,
            "data": {
                "push": { "sound": "default", "priority": "normal" },
                "tag": tag,
                "color": "#0099ff",
            },
        })
    }

    async fn notify(&self, payload: &Value) -> Result<(), SinkError> {
        let url = format!(
            "{}/api/services/notify/{}",
            self.base_url(),
            self.config.notification_service
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.token)
            .json(payload)
            .send()
            .await?;
        require_success("home_assistant", &response)
    }
}

#[async_trait]
impl NotificationSink for HomeAssistantSink {
    fn name(&self) -> &'static str {
        "home_assistant"
    }

    async fn initialize(&mut self) -> Result<(), SinkError> {
        let response = self
            .http
            .get(format!("{}/api/", self.base_url()))
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        require_success("home_assistant", &response)?;

        log::info!(
            "   │  Critical alerts: {}, volume {}",
            if self.config.critical_alerts { "enabled" } else { "disabled" },
            self.config.critical_volume
        );
        Ok(())
    }

    async fn send_alert(&self, alert: &Alert) -> Result<(), SinkError> {
        self.notify(&self.alert_payload(alert)).await
    }

    async fn send_status(&self, summary: &StatusSummary) -> Result<(), SinkError> {
        self.notify(&Self::plain_payload(
            "Stock Monitor Status",
            &summary.render(),
            "stock_status",
        ))
        .await
    }

    async fn send_startup(&self, message: &str) -> Result<(), SinkError> {
        self.notify(&Self::plain_payload("Stock Monitor", message, "stock_startup"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(critical_alerts: bool) -> HomeAssistantSink {
        HomeAssistantSink::new(
            HomeAssistantConfig {
                enabled: true,
                url: "http://ha.local:8123/".into(),
                token: "secret".into(),
                notification_service: "mobile_app_phone".into(),
                critical_alerts,
                critical_volume: 0.5,
            },
            reqwest::Client::new(),
        )
    }

    fn alert() -> Alert {
        Alert {
            title: "Stock Alert".into(),
            body: String::new(),
            url: "https://store.example/a1".into(),
            price: "£1799".into(),
            product: "RTX 5090 (A1)".into(),
        }
    }

    #[test]
    fn test_critical_payload_for_restock() {
        let payload = sink(true).alert_payload(&alert());

        assert_eq!(payload["data"]["critical"], true);
        assert_eq!(payload["data"]["interruption-level"], "critical");
        assert_eq!(payload["data"]["push"]["sound"]["volume"], 0.5);
        assert_eq!(payload["data"]["tag"], "stock_rtx_5090__a1_");
    }

    #[test]
    fn test_standard_payload_when_critical_disabled() {
        let payload = sink(false).alert_payload(&alert());

        assert!(payload["data"].get("critical").is_none());
        assert_eq!(payload["data"]["push"]["channel"], "stock_alerts");
        assert_eq!(sink(false).base_url(), "http://ha.local:8123");
    }
}
