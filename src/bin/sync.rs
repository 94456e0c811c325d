//! Sync Binary - spreadsheet to snapshot
//!
//! Discovers the year-sheets, ingests all of them and replaces the stored
//! snapshot. A failed run keeps the previous snapshot; in one-shot mode it
//! also makes the process exit with a non-zero status.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin sync -- --backend sqlite
//! ```
//!
//! ## Environment Variables
//!
//! - GOOGLE_SHEET_ID - spreadsheet document id (required)
//! - GOOGLE_SHEET_GID - gid the default view should resolve to (default: 0)
//! - SYNC_INTERVAL_SECS - repeat every N seconds until CTRL+C (default: run once)
//! - INGEST_TIMEOUT_SECS - abandon a run after N seconds (default: 60)
//! - ORDERFLOW_DB_PATH / ORDERFLOW_SNAPSHOT_PATH - snapshot location per backend
//! - RUST_LOG - Logging level (optional, default: info)

use chrono::Datelike;
use dotenv::dotenv;
use log::{error, info, warn};
use orderflow::config::{IngestConfig, StoreConfig};
use orderflow::ingest::{run_with_timeout, GvizSource, IngestOptions, SheetSource, SyncReport};
use orderflow::IngestError;
use orderflow::snapshot::{open_store, SnapshotStore};
use std::env;
use std::sync::Arc;

async fn run_once(
    source: Arc<dyn SheetSource>,
    store: &dyn SnapshotStore,
    config: &IngestConfig,
) -> Result<SyncReport, IngestError> {
    let options = IngestOptions::from_config(config, chrono::Local::now().year());

    info!("🔄 Sync started (current year {})", options.current_year);
    match run_with_timeout(source, store, &options).await {
        Ok(report) => {
            info!("✅ Sync complete");
            info!("   ├─ Sheets: {:?}", report.meta.sheet_names);
            info!("   ├─ Orders: {}", report.meta.record_count);
            info!("   └─ Last sync: {}", report.meta.last_sync.to_rfc3339());
            Ok(report)
        }
        Err(e) => {
            error!("❌ Sync failed: {}", e);
            warn!("   └─ Previous snapshot kept");
            Err(e)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let ingest_config = IngestConfig::from_env()?;
    let store_config = StoreConfig::from_env(&args);

    info!("🚀 Orderflow sync");
    info!("   ├─ Spreadsheet: {}", ingest_config.sheet_id);
    info!("   ├─ Target gid: {}", ingest_config.target_gid);
    info!("   ├─ Sheet prefix: {:?}", ingest_config.sheet_prefix);
    info!("   ├─ Fetch timeout: {}s", ingest_config.fetch_timeout.as_secs());
    info!("   └─ Ingest timeout: {}s", ingest_config.ingest_timeout.as_secs());

    let source: Arc<dyn SheetSource> = Arc::new(GvizSource::from_config(&ingest_config)?);
    let store = open_store(&store_config)?;

    let Some(every) = ingest_config.sync_interval else {
        run_once(source, store.as_ref(), &ingest_config).await?;
        return Ok(());
    };

    info!("🔄 Periodic sync every {}s, press CTRL+C to stop", every.as_secs());
    let mut ticker = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // A failed tick is logged and retried on the next one
                let _ = run_once(source.clone(), store.as_ref(), &ingest_config).await;
            }
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
                    Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
                }
                break;
            }
        }
    }

    info!("✅ Sync stopped");
    Ok(())
}
