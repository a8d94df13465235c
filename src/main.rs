//! Status Page Collector Binary

use chrono::{DateTime, SubsecRound, Utc};
use clap::Parser;
use status_collector::{Config, HttpProber, LogStore, Result, Settings, StatusCollector};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    initialize_tracing();

    let settings = Settings::parse();

    // Captured once; every record in this run shares it
    let now = Utc::now().trunc_subsecs(0);

    info!("Starting status collector v{} at {}", env!("CARGO_PKG_VERSION"), now);

    if let Err(e) = run(&settings, now).await {
        error!("Status collection failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(settings: &Settings, now: DateTime<Utc>) -> Result<()> {
    let config = Config::from_file(&settings.config_path)?;

    info!(
        "Collector configuration - Config: {}, Logs: {}, Probe timeout: {}s",
        settings.config_path.display(),
        settings.logs_dir.display(),
        settings.probe_timeout_seconds
    );

    let store = LogStore::open(&settings.logs_dir)?;
    let prober = HttpProber::new(settings.probe_timeout())?;
    let collector = StatusCollector::new(config, store, prober)?;
    info!("Run {} starting", collector.run_id());

    let report = collector.run(now).await?;

    let failing = report.failing_sites();
    info!(
        "Run {} complete - Groups: {}, Sites: {}, Failing: {}",
        report.run_id,
        report.groups.len(),
        report.site_count(),
        if failing.is_empty() { "none".to_string() } else { failing.join(", ") }
    );

    if let Ok(json) = serde_json::to_string(&report) {
        debug!(report = %json, "Run report");
    }

    Ok(())
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
