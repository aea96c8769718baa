//! Scheduler loop
//!
//! One cycle is `Polling -> Reconciling -> Dispatching -> Idle`. Cycles never
//! overlap: the poll timer delays missed ticks instead of bursting them, and a
//! shutdown signal abandons an in-flight cycle, including its HTTP request.

pub mod state;

pub use state::{MonitorState, Phase, RequestStats};

use crate::catalog::{Catalog, ListedProduct};
use crate::config::Config;
use crate::error::CatalogError;
use crate::notify::{Alert, DispatchReport, Dispatcher};
use crate::persistence::ProductStore;
use crate::reconcile::{reconcile, IdentityChange, ProductIdentityChanged};
use crate::status::StatusSummary;
use crate::tracker::{AvailabilityTracker, Decision};
use crate::types::{NotificationEvent, Product};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

/// Loop settings taken from [`Config`].
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub locale: String,
    pub currency: String,
    pub check_interval: Duration,
    pub cooldown: Duration,
    pub status_enabled: bool,
    pub status_interval: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            locale: config.locale.clone(),
            currency: config.currency.clone(),
            check_interval: config.check_interval,
            cooldown: config.cooldown,
            status_enabled: config.status_enabled,
            status_interval: config.status_interval,
        }
    }
}

/// What one cycle did.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub entries: usize,
    pub changes: Vec<ProductIdentityChanged>,
    /// False when drift was found but the mapping could not be saved.
    pub persisted: bool,
    pub events: Vec<NotificationEvent>,
    pub dispatches: Vec<DispatchReport>,
}

pub struct Monitor {
    settings: MonitorSettings,
    catalog: Catalog,
    store: ProductStore,
    dispatcher: Dispatcher,
    state: MonitorState,
}

impl Monitor {
    pub fn new(
        settings: MonitorSettings,
        catalog: Catalog,
        store: ProductStore,
        dispatcher: Dispatcher,
        products: Vec<Product>,
    ) -> Self {
        let tracker = AvailabilityTracker::new(settings.cooldown);
        Self {
            state: MonitorState::new(products, tracker, Utc::now()),
            settings,
            catalog,
            store,
            dispatcher,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one poll-reconcile-dispatch cycle.
    ///
    /// A catalog failure skips the cycle and leaves all state untouched apart
    /// from the request counters.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport, CatalogError> {
        self.state.phase = Phase::Polling;
        let entries = match self
            .catalog
            .snapshot(&self.settings.locale, &self.state.products)
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                self.state.stats.record(now, false);
                self.state.phase = Phase::Idle;
                return Err(e);
            }
        };
        self.state.stats.record(now, true);

        self.state.phase = Phase::Reconciling;
        let reconciliation = reconcile(&self.state.products, &entries);
        let mut report = CycleReport {
            entries: entries.len(),
            changes: reconciliation.changes.clone(),
            persisted: true,
            ..CycleReport::default()
        };

        if reconciliation.has_drift() {
            for change in &reconciliation.changes {
                log::info!("🔁 {}", change);
            }

            match self.store.save(&reconciliation.products) {
                Ok(()) => {
                    for change in &reconciliation.changes {
                        if let IdentityChange::IdentifierChanged { from, to } = &change.change {
                            self.state.tracker.rekey(from, to);
                        }
                    }
                    self.state.products = reconciliation.products.clone();
                    log::info!("💾 Product mapping saved to {}", self.store.path().display());
                }
                Err(e) => {
                    log::error!("❌ Failed to save product mapping, keeping previous: {}", e);
                    report.persisted = false;
                }
            }
        }

        for &index in &reconciliation.unlisted {
            let product = &self.state.products[index];
            if self.state.unlisted.insert(product.watch.clone()) {
                log::warn!("⚠️  {} is not listed by the vendor", product.label());
            }
        }

        let mut events = Vec::new();
        for matched in &reconciliation.matches {
            let product = &self.state.products[matched.product_index];
            if self.state.unlisted.remove(&product.watch) {
                log::info!("ℹ️  {} is listed again", product.label());
            }

            // Unsaved drift: the old mapping stays authoritative this cycle
            if matched.drifted && !report.persisted {
                continue;
            }

            let entry = &matched.entry;
            match self.state.tracker.observe(&entry.identifier, entry.in_stock, now) {
                Decision::Notify => {
                    log::info!("🟢 {} is IN STOCK at {}", product.label(), entry.price);
                    events.push(NotificationEvent {
                        product: product.clone(),
                        in_stock: true,
                        price: entry.price.clone(),
                        url: entry.url.clone(),
                        timestamp: now,
                    });
                }
                Decision::CooldownActive { until } => {
                    log::info!(
                        "⏳ {} restocked, alert suppressed until {}",
                        product.label(),
                        until.format("%H:%M:%S")
                    );
                }
                Decision::WentOutOfStock => {
                    log::info!("🔴 {} went out of stock", product.label());
                }
                Decision::StillInStock | Decision::StillOutOfStock => {}
            }
        }

        self.state.phase = Phase::Dispatching;
        for event in &events {
            let alert = Alert::from_event(event, &self.settings.currency);
            let dispatch = self.dispatcher.dispatch(&alert).await;
            dispatch.log(&format!("Alert for {}", event.product.label()));
            report.dispatches.push(dispatch);
        }
        report.events = events;

        self.state.phase = Phase::Idle;
        log::debug!(
            "Cycle complete: {} entries, {} changes, {} alerts",
            report.entries,
            report.changes.len(),
            report.events.len()
        );
        Ok(report)
    }

    pub fn status_summary(&self, now: DateTime<Utc>) -> StatusSummary {
        let stats = &self.state.stats;
        StatusSummary {
            runtime: now - stats.started_at,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            last_check_time: stats.last_check_time,
            last_check_success: stats.last_check_success,
            monitored: self.state.products.iter().map(Product::label).collect(),
            generated_at: now,
        }
    }

    pub async fn emit_status(&self, now: DateTime<Utc>) -> DispatchReport {
        let summary = self.status_summary(now);
        log::info!("📊 Status");
        for line in summary.render().lines() {
            log::info!("   ├─ {}", line);
        }

        let report = self.dispatcher.broadcast_status(&summary).await;
        report.log("Status update");
        report
    }

    /// Poll until `shutdown` flips to true or its sender goes away.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut poll = interval(self.settings.check_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let status_every = self.settings.status_interval;
        let mut status = interval_at(Instant::now() + status_every, status_every);
        status.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!(
            "🔄 Monitoring {} products every {:?}",
            self.state.products.len(),
            self.settings.check_interval
        );

        while !*shutdown.borrow() {
            tokio::select! {
                biased;

                _ = shutdown.changed() => break,

                _ = poll.tick() => {
                    let stopped = tokio::select! {
                        biased;
                        _ = shutdown.changed() => {
                            log::info!("⚠️  Shutdown during {} phase, abandoning cycle", self.state.phase);
                            true
                        }
                        result = self.run_cycle(Utc::now()) => {
                            if let Err(e) = result {
                                log::error!("❌ Stock check failed: {}", e);
                            }
                            false
                        }
                    };
                    if stopped {
                        break;
                    }
                }

                _ = status.tick(), if self.settings.status_enabled => {
                    self.emit_status(Utc::now()).await;
                }
            }
        }

        self.state.phase = Phase::Stopped;
        self.dispatcher.shutdown().await;
        log::info!("✅ Monitor stopped");
    }
}

/// Body of the startup notification.
pub fn startup_message(config: &Config) -> String {
    let enabled = |on: bool| if on { "Enabled" } else { "Disabled" };
    format!(
        "🚀 Stock monitor started\n\
         🎯 Monitoring: {}\n\
         🌍 Country: {}\n\
         ⏱️ Check interval: {} seconds\n\
         ⚡ Browser auto-open: {}\n\
         🔄 SKU refresh interval: {} seconds",
        if config.products.is_empty() {
            "None".to_string()
        } else {
            config.products.join(", ")
        },
        config.country,
        config.check_interval.as_secs(),
        enabled(config.sinks.browser.enabled),
        config.sku_refresh_interval.as_secs()
    )
}

/// Synthetic in-stock alert used by `--test`.
pub fn test_alert(config: &Config) -> Alert {
    let mut product = Product::new("TEST-SKU", &config.locale);
    product.identifier = Some("TEST-SKU".to_string());

    Alert::from_event(
        &NotificationEvent {
            product,
            in_stock: true,
            price: "9.99".to_string(),
            url: config.api.store_url.clone(),
            timestamp: Utc::now(),
        },
        &config.currency,
    )
}

/// Lines printed by `--list-products`, marking tracked products.
pub fn render_listing(listing: &[ListedProduct], tracked: &[Product]) -> Vec<String> {
    listing
        .iter()
        .map(|listed| {
            let is_tracked = tracked.iter().any(|p| {
                p.identifier.as_deref() == Some(listed.sku.as_str()) || p.matches_name(&listed.name)
            });
            let marker = if is_tracked { "✅ tracked" } else { "  -" };
            format!("{:<12} {} ({})", marker, listed.name, listed.sku)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::from_lookup(|key| match key {
            "SKUWATCH_PRODUCTS" => Some("RTX 5090,RTX 5080".to_string()),
            "BROWSER_ENABLED" => Some("false".to_string()),
            _ => None,
        })
    }

    #[test]
    fn test_startup_message() {
        let message = startup_message(&config());
        assert!(message.contains("Monitoring: RTX 5090, RTX 5080"));
        assert!(message.contains("Country: United Kingdom"));
        assert!(message.contains("Check interval: 10 seconds"));
        assert!(message.contains("Browser auto-open: Disabled"));
    }

    #[test]
    fn test_test_alert() {
        let config = config();
        let alert = test_alert(&config);

        assert!(alert.body.starts_with("IN STOCK: "));
        assert_eq!(alert.price, "£9.99");
        assert_eq!(alert.product, "TEST-SKU (TEST-SKU)");
        assert_eq!(alert.url, config.api.store_url);
    }

    #[test]
    fn test_render_listing() {
        let listing = vec![
            ListedProduct { sku: "A1".into(), name: "NVIDIA RTX 5090".into() },
            ListedProduct { sku: "B1".into(), name: "NVIDIA RTX 4060".into() },
        ];
        let lines = render_listing(&listing, &[Product::new("RTX 5090", "en-gb")]);

        assert!(lines[0].starts_with("✅ tracked"));
        assert!(lines[0].ends_with("NVIDIA RTX 5090 (A1)"));
        assert!(lines[1].starts_with("  -"));
    }
}
