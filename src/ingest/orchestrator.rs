//! Ingestion orchestrator
//!
//! ```text
//! discover_sheets ──► ["Order 2024", "Order 2025"]
//!                          │
//!            ┌─────────────┴─────────────┐
//!      fetch + parse (0)          fetch + parse (1)     (JoinSet, concurrent)
//!            └─────────────┬─────────────┘
//!                  sort by index, concat
//!                          │
//!                  SnapshotStore::store   (only if every sheet succeeded)
//! ```
//!
//! A run is all-or-nothing. The first failed fetch returns early, dropping the
//! `JoinSet` and aborting every fetch still in flight.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use super::discovery::{discover_sheets, DiscoveryOptions};
use super::parser::parse_sheet;
use super::source::SheetSource;
use super::types::{IngestResult, Order, SyncMeta};
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::snapshot::SnapshotStore;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub sheet_prefix: String,
    pub target_gid: String,
    pub current_year: i32,
    /// Upper bound for discovery plus every fetch, used by `run_with_timeout`
    pub ingest_timeout: Duration,
}

impl IngestOptions {
    pub fn from_config(config: &IngestConfig, current_year: i32) -> Self {
        Self {
            sheet_prefix: config.sheet_prefix.clone(),
            target_gid: config.target_gid.clone(),
            current_year,
            ingest_timeout: config.ingest_timeout,
        }
    }

    pub fn discovery(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            sheet_prefix: self.sheet_prefix.clone(),
            target_gid: self.target_gid.clone(),
            current_year: self.current_year,
        }
    }
}

/// Outcome of a run that reached the store
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub result: IngestResult,
    pub meta: SyncMeta,
}

/// Discover the year-sheets, then fetch and parse all of them concurrently.
///
/// Orders come back grouped by sheet in discovery order, each sheet's rows in
/// row order, regardless of which fetch finished first.
pub async fn ingest_all(
    source: Arc<dyn SheetSource>,
    options: &IngestOptions,
) -> Result<IngestResult, IngestError> {
    let sheet_names = discover_sheets(source.clone(), &options.discovery())
        .await
        .map_err(IngestError::Discovery)?;

    let mut fetches = JoinSet::new();
    for (index, name) in sheet_names.iter().enumerate() {
        let source = source.clone();
        let name = name.clone();
        let current_year = options.current_year;
        fetches.spawn(async move {
            let result = source
                .fetch_grid(&name)
                .await
                .map(|grid| parse_sheet(&grid, &name, current_year));
            (index, name, result)
        });
    }

    let mut per_sheet: Vec<(usize, Vec<Order>)> = Vec::with_capacity(sheet_names.len());
    while let Some(joined) = fetches.join_next().await {
        let (index, sheet, result) = joined.map_err(|e| IngestError::Task(e.to_string()))?;
        match result {
            Ok(orders) => {
                log::info!("   ├─ {}: {} orders", sheet, orders.len());
                per_sheet.push((index, orders));
            }
            Err(source) => return Err(IngestError::Source { sheet, source }),
        }
    }

    per_sheet.sort_by_key(|(index, _)| *index);
    let orders: Vec<Order> = per_sheet.into_iter().flat_map(|(_, orders)| orders).collect();

    log::info!("   └─ {} orders across {} sheets", orders.len(), sheet_names.len());

    Ok(IngestResult { orders, sheet_names })
}

/// Ingest everything, then replace the snapshot in one write
pub async fn sync_snapshot(
    source: Arc<dyn SheetSource>,
    store: &dyn SnapshotStore,
    options: &IngestOptions,
) -> Result<SyncReport, IngestError> {
    let result = ingest_all(source, options).await?;
    persist(store, result).await
}

/// Like [`sync_snapshot`], but ingestion is abandoned after `options.ingest_timeout`.
///
/// The deadline covers discovery and fetching. When it elapses the in-flight
/// requests are aborted and the store is never touched.
pub async fn run_with_timeout(
    source: Arc<dyn SheetSource>,
    store: &dyn SnapshotStore,
    options: &IngestOptions,
) -> Result<SyncReport, IngestError> {
    let result = tokio::time::timeout(options.ingest_timeout, ingest_all(source, options))
        .await
        .map_err(|_| IngestError::Timeout(options.ingest_timeout))??;
    persist(store, result).await
}

async fn persist(store: &dyn SnapshotStore, result: IngestResult) -> Result<SyncReport, IngestError> {
    let meta = store.store(&result.orders, &result.sheet_names).await?;
    log::info!(
        "💾 Snapshot replaced ({}): {} orders from {:?}",
        store.backend_type(),
        meta.record_count,
        meta.sheet_names
    );
    Ok(SyncReport { result, meta })
}
