//! skuwatch - stock monitor runtime
//!
//! Usage:
//!   skuwatch [--test | --list-products] [--interval SECS] [--cooldown SECS] ...
//!
//! Configuration is read from the environment (and `.env`); see
//! `Config::from_env` for the variables.

use dotenv::dotenv;
use log::{error, info, warn};
use skuwatch::catalog::{Catalog, CatalogClient, HttpCatalogClient};
use skuwatch::config::{CliArgs, Config, USAGE};
use skuwatch::monitor::{self, Monitor, MonitorSettings};
use skuwatch::notify::{build_sinks, Dispatcher};
use skuwatch::persistence::{merge_tracked, ProductStore};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = CliArgs::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{}\n\n{}", e, USAGE);
        e
    })?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = Config::from_env();
    config.apply_args(&args);

    let client: Arc<dyn CatalogClient> = Arc::new(HttpCatalogClient::new(config.api.clone())?);
    let store = ProductStore::new(&config.products_file);

    if args.list_products {
        return list_products(&config, client, &store).await;
    }

    config.validate()?;

    info!("🚀 Stock monitor starting");
    info!("   ├─ Country: {} ({})", config.country, config.locale);
    info!("   ├─ Products: {}", config.products.join(", "));
    info!("   ├─ Check interval: {}s", config.check_interval.as_secs());
    info!("   ├─ Cooldown: {}s", config.cooldown.as_secs());
    info!("   ├─ SKU refresh interval: {}s", config.sku_refresh_interval.as_secs());
    if config.status_enabled {
        info!("   ├─ Status updates: every {}s", config.status_interval.as_secs());
    } else {
        info!("   ├─ Status updates: disabled");
    }
    info!("   └─ Product cache: {}", config.products_file.display());

    info!("🔧 Initializing notification sinks...");
    let http = reqwest::Client::builder()
        .timeout(config.dispatch_timeout)
        .build()?;
    let dispatcher = Dispatcher::initialize(build_sinks(&config.sinks, http), config.dispatch_timeout).await;
    if dispatcher.is_empty() {
        warn!("⚠️  No notification sinks are active, alerts will only be logged");
    }

    if args.test {
        info!("🧪 Sending test alert...");
        let report = dispatcher.dispatch(&monitor::test_alert(&config)).await;
        report.log("Test alert");
        dispatcher.shutdown().await;
        info!("✅ Test completed: delivered via [{}]", report.delivered().join(", "));
        return Ok(());
    }

    let persisted = store.load().unwrap_or_else(|e| {
        warn!("⚠️  Ignoring unreadable product cache: {}", e);
        Vec::new()
    });
    let products = merge_tracked(&config.products, &config.locale, persisted);

    dispatcher
        .broadcast_startup(&monitor::startup_message(&config))
        .await
        .log("Startup message");

    let catalog = Catalog::new(client, config.sku_refresh_interval);
    let mut monitor = Monitor::new(
        MonitorSettings::from_config(&config),
        catalog,
        store,
        dispatcher,
        products,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("❌ Failed to listen for CTRL+C: {}", err);
            // Keep the sender alive so the monitor keeps running
            std::future::pending::<()>().await;
        }
        info!("⚠️  Received CTRL+C, shutting down...");
        let _ = shutdown_tx.send(true);
    });

    info!("🔄 Press CTRL+C to stop");
    monitor.run(shutdown_rx).await;
    Ok(())
}

async fn list_products(
    config: &Config,
    client: Arc<dyn CatalogClient>,
    store: &ProductStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut catalog = Catalog::new(client, config.sku_refresh_interval);
    catalog.refresh_listing(&config.locale).await?;

    let persisted = store.load().unwrap_or_default();
    let tracked = merge_tracked(&config.products, &config.locale, persisted);

    println!("\nProducts listed for {} ({}):", config.country, config.locale);
    for line in monitor::render_listing(catalog.listing(), &tracked) {
        println!("  {}", line);
    }

    println!("\nCurrently monitoring:");
    if tracked.is_empty() {
        println!("  None");
    }
    for product in &tracked {
        println!("  {}", product.label());
    }
    Ok(())
}
