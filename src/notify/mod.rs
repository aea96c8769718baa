//! Notification fan-out
//!
//! A [`Dispatcher`] owns the initialised sinks and delivers each message to
//! all of them concurrently. Every sink call runs in its own task under a
//! timeout, so a slow, failing or panicking sink only affects its own entry
//! in the [`DispatchReport`].
//!
//! Sinks:
//! - `console` - stdout
//! - `sound` - local sound cue on restock
//! - `browser` - opens the product page on restock
//! - `discord` - webhook embed
//! - `telegram` - bot `sendMessage`
//! - `ntfy` - JSON publish
//! - `home_assistant` - `notify` service call

pub mod browser;
pub mod console;
pub mod discord;
pub mod home_assistant;
pub mod ntfy;
pub mod sound;
pub mod telegram;

use crate::config::SinkConfig;
use crate::error::SinkError;
use crate::status::StatusSummary;
use crate::types::NotificationEvent;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};

/// Content of a stock alert, as every sink receives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub url: String,
    /// Price with the currency symbol applied.
    pub price: String,
    pub product: String,
}

impl Alert {
    /// Restock alert for `event`. The tracker only emits in-stock events.
    pub fn from_event(event: &NotificationEvent, currency: &str) -> Self {
        let product = event.product.label();
        let price = format!("{}{}", currency, event.price);

        Self {
            title: "Stock Alert".to_string(),
            body: format!("IN STOCK: {}\nPrice: {}", product, price),
            url: event.url.clone(),
            price,
            product,
        }
    }
}

/// One outbound notification channel.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Connectivity check before the monitor starts. Sinks that fail here are
    /// dropped for the rest of the run.
    async fn initialize(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn send_alert(&self, alert: &Alert) -> Result<(), SinkError>;

    async fn send_status(&self, _summary: &StatusSummary) -> Result<(), SinkError> {
        Ok(())
    }

    async fn send_startup(&self, _message: &str) -> Result<(), SinkError> {
        Ok(())
    }

    async fn shutdown(&self) {}
}

/// Per-sink outcome of one delivery.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: BTreeMap<&'static str, Result<(), SinkError>>,
}

impl DispatchReport {
    pub fn record(&mut self, sink: &'static str, outcome: Result<(), SinkError>) {
        self.outcomes.insert(sink, outcome);
    }

    pub fn delivered(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_ok())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn failed(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_err())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn all_delivered(&self) -> bool {
        self.outcomes.values().all(|outcome| outcome.is_ok())
    }

    /// Log one line per failed sink and a summary.
    pub fn log(&self, what: &str) {
        for (name, outcome) in &self.outcomes {
            if let Err(e) = outcome {
                log::warn!("⚠️  {} not delivered via {}: {}", what, name, e);
            }
        }
        log::debug!(
            "{} delivered via [{}], failed via [{}]",
            what,
            self.delivered().join(", "),
            self.failed().join(", ")
        );
    }
}

pub struct Dispatcher {
    sinks: Vec<Arc<dyn NotificationSink>>,
    timeout: Duration,
}

impl Dispatcher {
    /// Initialise every sink and keep the ones that come up.
    pub async fn initialize(sinks: Vec<Box<dyn NotificationSink>>, timeout: Duration) -> Self {
        let mut ready: Vec<Arc<dyn NotificationSink>> = Vec::new();

        for mut sink in sinks {
            let name = sink.name();
            match tokio::time::timeout(timeout, sink.initialize()).await {
                Ok(Ok(())) => {
                    log::info!("   ├─ ✅ {} notifications ready", name);
                    ready.push(Arc::from(sink));
                }
                Ok(Err(e)) => log::error!("   ├─ ❌ Failed to initialize {}: {}", name, e),
                Err(_) => log::error!("   ├─ ❌ {} did not initialize within {:?}", name, timeout),
            }
        }

        log::info!("   └─ {} notification sink(s) active", ready.len());
        Self::new(ready, timeout)
    }

    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>, timeout: Duration) -> Self {
        Self { sinks, timeout }
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub async fn dispatch(&self, alert: &Alert) -> DispatchReport {
        let alert = Arc::new(alert.clone());
        self.fan_out(move |sink| {
            let alert = alert.clone();
            async move { sink.send_alert(&alert).await }
        })
        .await
    }

    pub async fn broadcast_status(&self, summary: &StatusSummary) -> DispatchReport {
        let summary = Arc::new(summary.clone());
        self.fan_out(move |sink| {
            let summary = summary.clone();
            async move { sink.send_status(&summary).await }
        })
        .await
    }

    pub async fn broadcast_startup(&self, message: &str) -> DispatchReport {
        let message: Arc<str> = Arc::from(message);
        self.fan_out(move |sink| {
            let message = message.clone();
            async move { sink.send_startup(&message).await }
        })
        .await
    }

    pub async fn shutdown(&self) {
        for sink in &self.sinks {
            sink.shutdown().await;
        }
    }

    async fn fan_out<F, Fut>(&self, call: F) -> DispatchReport
    where
        F: Fn(Arc<dyn NotificationSink>) -> Fut,
        Fut: Future<Output = Result<(), SinkError>> + Send + 'static,
    {
        let mut tasks = JoinSet::new();

        for sink in &self.sinks {
            let name = sink.name();
            let timeout = self.timeout;
            let delivery = AbortOnDrop(tokio::spawn(call(sink.clone())));

            tasks.spawn(async move {
                // Dropping the wrapper (timeout or abandoned dispatch) aborts the delivery
                let mut delivery = delivery;
                let outcome = match tokio::time::timeout(timeout, &mut delivery.0).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(join_error)) => Err(SinkError::Crashed(join_error.to_string())),
                    Err(_) => Err(SinkError::Timeout(timeout)),
                };
                (name, outcome)
            });
        }

        let mut report = DispatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, outcome)) => report.record(name, outcome),
                Err(e) => log::error!("❌ Dispatch task failed: {}", e),
            }
        }
        report
    }
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<Result<(), SinkError>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Build the enabled sinks from configuration.
pub fn build_sinks(config: &SinkConfig, http: reqwest::Client) -> Vec<Box<dyn NotificationSink>> {
    let mut sinks: Vec<Box<dyn NotificationSink>> = Vec::new();

    if config.console.enabled {
        sinks.push(Box::new(console::ConsoleSink::new()));
    }
    if config.sound.enabled {
        sinks.push(Box::new(sound::SoundSink::new()));
    }
    if config.browser.enabled {
        sinks.push(Box::new(browser::BrowserSink::new()));
    }
    if config.discord.enabled {
        sinks.push(Box::new(discord::DiscordSink::new(config.discord.clone(), http.clone())));
    }
    if config.telegram.enabled {
        sinks.push(Box::new(telegram::TelegramSink::new(config.telegram.clone(), http.clone())));
    }
    if config.ntfy.enabled {
        sinks.push(Box::new(ntfy::NtfySink::new(config.ntfy.clone(), http.clone())));
    }
    if config.home_assistant.enabled {
        sinks.push(Box::new(home_assistant::HomeAssistantSink::new(
            config.home_assistant.clone(),
            http,
        )));
    }

    sinks
}

/// Shared response check for HTTP-based sinks.
pub(crate) fn require_success(sink: &str, response: &reqwest::Response) -> Result<(), SinkError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(SinkError::Unavailable(format!("{} returned {}", sink, status)))
    }
}
