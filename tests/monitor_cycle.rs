//! End-to-end cycle tests
//!
//! Drive `Monitor::run_cycle` with a scripted in-process catalog and
//! recording sinks, so every poll sequence is deterministic.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use skuwatch::catalog::{Catalog, CatalogClient, InventoryRow, ListedProduct};
use skuwatch::error::{CatalogError, SinkError};
use skuwatch::monitor::{Monitor, MonitorSettings, Phase};
use skuwatch::notify::{Alert, Dispatcher, NotificationSink};
use skuwatch::persistence::ProductStore;
use skuwatch::reconcile::IdentityChange;
use skuwatch::types::Product;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

struct ScriptedCatalog {
    listing: Mutex<Vec<ListedProduct>>,
    inventory: Mutex<VecDeque<Result<Vec<InventoryRow>, CatalogError>>>,
}

impl ScriptedCatalog {
    fn new(listing: Vec<ListedProduct>) -> Arc<Self> {
        Arc::new(Self {
            listing: Mutex::new(listing),
            inventory: Mutex::new(VecDeque::new()),
        })
    }

    fn set_listing(&self, listing: Vec<ListedProduct>) {
        *self.listing.lock().unwrap() = listing;
    }

    fn push(&self, rows: Vec<InventoryRow>) {
        self.inventory.lock().unwrap().push_back(Ok(rows));
    }

    fn push_err(&self, e: CatalogError) {
        self.inventory.lock().unwrap().push_back(Err(e));
    }
}

#[async_trait]
impl CatalogClient for ScriptedCatalog {
    async fn fetch_listing(&self, _locale: &str) -> Result<Vec<ListedProduct>, CatalogError> {
        Ok(self.listing.lock().unwrap().clone())
    }

    async fn fetch_inventory(
        &self,
        _locale: &str,
        _skus: &[String],
    ) -> Result<Vec<InventoryRow>, CatalogError> {
        self.inventory
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CatalogError::UpstreamUnavailable("script exhausted".into())))
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    alerts: Arc<Mutex<Vec<Alert>>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send_alert(&self, alert: &Alert) -> Result<(), SinkError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct BrokenSink;

#[async_trait]
impl NotificationSink for BrokenSink {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn send_alert(&self, _alert: &Alert) -> Result<(), SinkError> {
        Err(SinkError::Unavailable("webhook returned 503".into()))
    }
}

fn listed(sku: &str, name: &str) -> ListedProduct {
    ListedProduct {
        sku: sku.into(),
        name: name.into(),
    }
}

fn row(sku: &str, in_stock: bool, price: &str) -> InventoryRow {
    InventoryRow {
        sku: sku.into(),
        in_stock,
        price: price.into(),
        url: format!("https://store.example/{sku}"),
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn settings(cooldown: Duration) -> MonitorSettings {
    MonitorSettings {
        locale: "en-gb".into(),
        currency: "£".into(),
        check_interval: Duration::from_secs(10),
        cooldown,
        status_enabled: false,
        status_interval: Duration::from_secs(3600),
    }
}

struct Harness {
    monitor: Monitor,
    catalog: Arc<ScriptedCatalog>,
    sink: RecordingSink,
    store_path: std::path::PathBuf,
    _dir: TempDir,
}

fn harness(listing: Vec<ListedProduct>, products: Vec<Product>, cooldown: Duration) -> Harness {
    harness_with(listing, products, cooldown, None)
}

fn harness_with(
    listing: Vec<ListedProduct>,
    products: Vec<Product>,
    cooldown: Duration,
    store_path: Option<std::path::PathBuf>,
) -> Harness {
    let dir = TempDir::new().unwrap();
    let store_path = store_path.unwrap_or_else(|| dir.path().join("products.json"));

    let catalog = ScriptedCatalog::new(listing);
    let client: Arc<dyn CatalogClient> = catalog.clone();
    let sink = RecordingSink::default();
    let dispatcher = Dispatcher::new(
        vec![Arc::new(sink.clone()), Arc::new(BrokenSink)],
        Duration::from_secs(5),
    );

    let monitor = Monitor::new(
        settings(cooldown),
        Catalog::new(client, Duration::ZERO),
        ProductStore::new(&store_path),
        dispatcher,
        products,
    );

    Harness {
        monitor,
        catalog,
        sink,
        store_path,
        _dir: dir,
    }
}

fn resolved(watch: &str, sku: &str, name: &str) -> Product {
    Product {
        watch: watch.into(),
        identifier: Some(sku.into()),
        display_name: name.into(),
        locale: "en-gb".into(),
    }
}

#[tokio::test]
async fn test_restock_produces_exactly_one_event() {
    let mut h = harness(
        vec![listed("A", "NVIDIA RTX 5090")],
        vec![resolved("RTX 5090", "A", "NVIDIA RTX 5090")],
        Duration::from_secs(120),
    );
    h.catalog.push(vec![row("A", false, "1999")]);
    h.catalog.push(vec![row("A", true, "1999")]);

    let first = h.monitor.run_cycle(at(0)).await.unwrap();
    assert!(first.events.is_empty());

    let second = h.monitor.run_cycle(at(10)).await.unwrap();
    assert_eq!(second.events.len(), 1);
    assert_eq!(second.events[0].price, "1999");
    assert!(second.events[0].in_stock);
    assert_eq!(second.events[0].timestamp, at(10));

    let alerts = h.sink.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].price, "£1999");
    assert_eq!(alerts[0].url, "https://store.example/A");
}

#[tokio::test]
async fn test_steady_in_stock_notifies_once_for_any_cooldown() {
    // Cooldown shorter than the poll interval, then longer than five polls
    for cooldown in [Duration::from_secs(5), Duration::from_secs(600)] {
        let mut h = harness(
            vec![listed("A", "NVIDIA RTX 5090")],
            vec![resolved("RTX 5090", "A", "NVIDIA RTX 5090")],
            cooldown,
        );

        let mut events = 0;
        for poll in 0..5 {
            h.catalog.push(vec![row("A", true, "1999")]);
            events += h.monitor.run_cycle(at(poll * 10)).await.unwrap().events.len();
        }

        assert_eq!(events, 1, "cooldown {:?}", cooldown);
    }
}

#[tokio::test]
async fn test_cooldown_is_per_product() {
    let mut h = harness(
        vec![listed("A", "NVIDIA RTX 5090"), listed("B", "NVIDIA RTX 5080")],
        vec![
            resolved("RTX 5090", "A", "NVIDIA RTX 5090"),
            resolved("RTX 5080", "B", "NVIDIA RTX 5080"),
        ],
        Duration::from_secs(3600),
    );
    h.catalog.push(vec![row("A", true, "1999"), row("B", false, "999")]);
    h.catalog.push(vec![row("A", false, "1999"), row("B", true, "999")]);
    h.catalog.push(vec![row("A", true, "1999"), row("B", true, "999")]);

    let labels = |events: &[skuwatch::NotificationEvent]| -> Vec<String> {
        events.iter().map(|e| e.product.watch.clone()).collect()
    };

    assert_eq!(labels(&h.monitor.run_cycle(at(0)).await.unwrap().events), vec!["RTX 5090"]);
    // A's cooldown does not hold back B
    assert_eq!(labels(&h.monitor.run_cycle(at(10)).await.unwrap().events), vec!["RTX 5080"]);
    // A flaps back inside its own cooldown
    assert!(h.monitor.run_cycle(at(20)).await.unwrap().events.is_empty());
}

#[tokio::test]
async fn test_rename_preserves_availability_state() {
    let mut h = harness(
        vec![listed("A", "NVIDIA RTX 5090")],
        vec![resolved("RTX 5090", "A", "NVIDIA RTX 5090")],
        Duration::from_secs(0),
    );
    h.catalog.push(vec![row("A", true, "1999")]);
    assert_eq!(h.monitor.run_cycle(at(0)).await.unwrap().events.len(), 1);

    h.catalog.set_listing(vec![listed("A", "NVIDIA GeForce RTX 5090 Founders Edition")]);
    h.catalog.push(vec![row("A", true, "1999")]);
    let report = h.monitor.run_cycle(at(10)).await.unwrap();

    assert_eq!(report.changes.len(), 1);
    assert!(report.persisted);
    // Still in stock under the new name: no second alert
    assert!(report.events.is_empty());

    let state = h.monitor.state();
    assert_eq!(state.products[0].display_name, "NVIDIA GeForce RTX 5090 Founders Edition");
    assert!(state.tracker.state("A").unwrap().last_known_in_stock);

    let saved = ProductStore::new(&h.store_path).load().unwrap();
    assert_eq!(saved[0].display_name, "NVIDIA GeForce RTX 5090 Founders Edition");
}

#[tokio::test]
async fn test_identifier_change_moves_state() {
    let mut h = harness(
        vec![listed("A1", "NVIDIA RTX 5090")],
        vec![resolved("RTX 5090", "A1", "NVIDIA RTX 5090")],
        Duration::from_secs(0),
    );
    h.catalog.push(vec![row("A1", true, "1999")]);
    h.monitor.run_cycle(at(0)).await.unwrap();

    h.catalog.set_listing(vec![listed("A2", "NVIDIA RTX 5090")]);
    h.catalog.push(vec![row("A2", true, "1999")]);
    let report = h.monitor.run_cycle(at(10)).await.unwrap();

    assert!(report.events.is_empty());
    let state = h.monitor.state();
    assert_eq!(state.products[0].identifier.as_deref(), Some("A2"));
    assert!(state.tracker.state("A1").is_none());
    assert!(state.tracker.state("A2").unwrap().last_known_in_stock);
}

#[tokio::test]
async fn test_replaced_sku_is_detected_while_old_sku_still_answers() {
    let mut h = harness(
        vec![listed("A2", "NVIDIA RTX 5090")],
        vec![resolved("RTX 5090", "A1", "NVIDIA RTX 5090")],
        Duration::from_secs(60),
    );
    // Inventory still reports the retired SKU next to its replacement
    h.catalog.push(vec![row("A1", false, "1999"), row("A2", true, "1999")]);

    let report = h.monitor.run_cycle(at(0)).await.unwrap();

    assert_eq!(report.changes.len(), 1);
    assert_eq!(
        report.changes[0].change,
        IdentityChange::IdentifierChanged {
            from: "A1".into(),
            to: "A2".into(),
        }
    );
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].url, "https://store.example/A2");

    let state = h.monitor.state();
    assert_eq!(state.products[0].identifier.as_deref(), Some("A2"));
    assert!(state.unlisted.is_empty());
}

#[tokio::test]
async fn test_first_resolution_is_persisted() {
    let mut h = harness(
        vec![listed("A1", "NVIDIA GeForce RTX 5090")],
        vec![Product::new("RTX 5090", "en-gb")],
        Duration::from_secs(60),
    );
    h.catalog.push(vec![row("A1", true, "1999")]);

    let report = h.monitor.run_cycle(at(0)).await.unwrap();
    assert_eq!(report.events.len(), 1);

    let saved = ProductStore::new(&h.store_path).load().unwrap();
    assert_eq!(saved[0].watch, "RTX 5090");
    assert_eq!(saved[0].identifier.as_deref(), Some("A1"));
}

#[tokio::test]
async fn test_persistence_failure_discards_drift() {
    let dir = TempDir::new().unwrap();
    let unwritable = dir.path().join("missing").join("products.json");
    let mut h = harness_with(
        vec![listed("A1", "NVIDIA GeForce RTX 5090"), listed("B1", "NVIDIA RTX 5080")],
        vec![
            Product::new("RTX 5090", "en-gb"),
            resolved("RTX 5080", "B1", "NVIDIA RTX 5080"),
        ],
        Duration::from_secs(60),
        Some(unwritable),
    );
    h.catalog.push(vec![row("A1", true, "1999"), row("B1", true, "999")]);

    let report = h.monitor.run_cycle(at(0)).await.unwrap();

    assert!(!report.persisted);
    // The stable product is still tracked; the drifted one is not
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].product.watch, "RTX 5080");

    let state = h.monitor.state();
    assert_eq!(state.products[0].identifier, None);
    assert!(state.tracker.state("A1").is_none());
}

#[tokio::test]
async fn test_upstream_failure_skips_cycle() {
    let mut h = harness(
        vec![listed("A", "NVIDIA RTX 5090")],
        vec![resolved("RTX 5090", "A", "NVIDIA RTX 5090")],
        Duration::from_secs(60),
    );
    h.catalog.push_err(CatalogError::UpstreamUnavailable("503".into()));
    h.catalog.push(vec![row("A", true, "1999")]);

    assert!(matches!(
        h.monitor.run_cycle(at(0)).await,
        Err(CatalogError::UpstreamUnavailable(_))
    ));
    assert!(h.monitor.state().tracker.is_empty());
    assert_eq!(h.monitor.state().stats.failed_requests, 1);
    assert_eq!(h.monitor.state().phase, Phase::Idle);

    // The next successful poll sees the restock
    assert_eq!(h.monitor.run_cycle(at(10)).await.unwrap().events.len(), 1);
    assert_eq!(h.monitor.state().stats.successful_requests, 1);
}

#[tokio::test]
async fn test_failing_sink_does_not_block_delivery() {
    let mut h = harness(
        vec![listed("A", "NVIDIA RTX 5090")],
        vec![resolved("RTX 5090", "A", "NVIDIA RTX 5090")],
        Duration::from_secs(60),
    );
    h.catalog.push(vec![row("A", true, "1999")]);

    let report = h.monitor.run_cycle(at(0)).await.unwrap();

    let dispatch = &report.dispatches[0];
    assert_eq!(dispatch.delivered(), vec!["recording"]);
    assert_eq!(dispatch.failed(), vec!["broken"]);
    assert_eq!(h.sink.alerts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unlisted_product_is_not_out_of_stock() {
    let mut h = harness(
        vec![listed("A", "NVIDIA RTX 5090")],
        vec![resolved("RTX 5090", "A", "NVIDIA RTX 5090")],
        Duration::from_secs(0),
    );
    h.catalog.push(vec![row("A", true, "1999")]);
    h.monitor.run_cycle(at(0)).await.unwrap();

    // Delisted: no inventory call, state is left alone
    h.catalog.set_listing(vec![]);
    h.monitor.run_cycle(at(10)).await.unwrap();
    assert!(h.monitor.state().unlisted.contains("RTX 5090"));
    assert!(h.monitor.state().tracker.state("A").unwrap().last_known_in_stock);

    // Relisted and still in stock: no duplicate alert
    h.catalog.set_listing(vec![listed("A", "NVIDIA RTX 5090")]);
    h.catalog.push(vec![row("A", true, "1999")]);
    let report = h.monitor.run_cycle(at(20)).await.unwrap();
    assert!(report.events.is_empty());
    assert!(h.monitor.state().unlisted.is_empty());
}

#[tokio::test]
async fn test_status_summary_counts_requests() {
    let mut h = harness(
        vec![listed("A", "NVIDIA RTX 5090")],
        vec![resolved("RTX 5090", "A", "NVIDIA RTX 5090")],
        Duration::from_secs(60),
    );
    h.catalog.push(vec![row("A", false, "1999")]);
    h.monitor.run_cycle(at(0)).await.unwrap();

    let summary = h.monitor.status_summary(at(120));
    assert_eq!(summary.successful_requests, 1);
    assert_eq!(summary.last_check_time, Some(at(0)));
    assert_eq!(summary.monitored, vec!["NVIDIA RTX 5090 (A)"]);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let dir = TempDir::new().unwrap();
    let catalog = ScriptedCatalog::new(vec![listed("A", "NVIDIA RTX 5090")]);
    for _ in 0..100 {
        catalog.push(vec![row("A", false, "1999")]);
    }
    let client: Arc<dyn CatalogClient> = catalog.clone();

    let mut settings = settings(Duration::from_secs(60));
    settings.check_interval = Duration::from_millis(10);

    let mut monitor = Monitor::new(
        settings,
        Catalog::new(client, Duration::from_secs(3600)),
        ProductStore::new(dir.path().join("products.json")),
        Dispatcher::new(vec![], Duration::from_secs(1)),
        vec![resolved("RTX 5090", "A", "NVIDIA RTX 5090")],
    );

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = tx.send(true);
    });

    tokio::time::timeout(Duration::from_secs(5), monitor.run(rx))
        .await
        .expect("monitor did not stop");

    assert_eq!(monitor.state().phase, Phase::Stopped);
    assert!(monitor.state().stats.successful_requests >= 1);
}

struct HangingCatalog;

#[async_trait]
impl CatalogClient for HangingCatalog {
    async fn fetch_listing(&self, _locale: &str) -> Result<Vec<ListedProduct>, CatalogError> {
        Ok(vec![listed("A", "NVIDIA RTX 5090")])
    }

    async fn fetch_inventory(
        &self,
        _locale: &str,
        _skus: &[String],
    ) -> Result<Vec<InventoryRow>, CatalogError> {
        // Upstream that never answers
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(vec![])
    }
}

#[tokio::test]
async fn test_shutdown_interrupts_hung_request() {
    let dir = TempDir::new().unwrap();
    let client: Arc<dyn CatalogClient> = Arc::new(HangingCatalog);

    let mut monitor = Monitor::new(
        settings(Duration::from_secs(60)),
        Catalog::new(client, Duration::from_secs(3600)),
        ProductStore::new(dir.path().join("products.json")),
        Dispatcher::new(vec![], Duration::from_secs(1)),
        vec![resolved("RTX 5090", "A", "NVIDIA RTX 5090")],
    );

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = tx.send(true);
    });

    tokio::time::timeout(Duration::from_secs(2), monitor.run(rx))
        .await
        .expect("shutdown did not interrupt the in-flight request");

    assert_eq!(monitor.state().phase, Phase::Stopped);
    assert_eq!(monitor.state().stats.successful_requests, 0);
}
