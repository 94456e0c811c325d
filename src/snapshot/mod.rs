//! Snapshot store: last ingested order set plus sync metadata
//!
//! A snapshot is replaced wholesale on every successful ingestion run and is
//! never partially updated. Reading before the first sync is not an error;
//! both `load` and `load_meta` return `Ok(None)`.
//!
//! Backends:
//! - `json_store` - one JSON document, written to a temp file and renamed
//! - `sqlite_store` - `orders` + `sync_meta` tables, replaced in one transaction

pub mod json_store;
pub mod sqlite_store;

pub use json_store::JsonSnapshotStore;
pub use sqlite_store::SqliteSnapshotStore;

use async_trait::async_trait;

use crate::config::{BackendType, StoreConfig};
use crate::ingest::types::{Order, SyncMeta};

#[derive(Debug)]
pub enum SnapshotError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Database(String),
}

impl From<std::io::Error> for SnapshotError {
    fn from(err: std::io::Error) -> Self {
        SnapshotError::Io(err)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Serialization(err)
    }
}

impl From<rusqlite::Error> for SnapshotError {
    fn from(err: rusqlite::Error) -> Self {
        SnapshotError::Database(err.to_string())
    }
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Io(e) => write!(f, "IO error: {}", e),
            SnapshotError::Serialization(e) => write!(f, "Serialization error: {}", e),
            SnapshotError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for SnapshotError {}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Replace the stored snapshot; returns the metadata that was written
    async fn store(&self, orders: &[Order], sheet_names: &[String]) -> Result<SyncMeta, SnapshotError>;

    /// Orders of the last successful sync, `None` before the first one
    async fn load(&self) -> Result<Option<Vec<Order>>, SnapshotError>;

    /// Metadata of the last successful sync, `None` before the first one
    async fn load_meta(&self) -> Result<Option<SyncMeta>, SnapshotError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}

/// Open the backend selected by `config`
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn SnapshotStore>, SnapshotError> {
    let store: Box<dyn SnapshotStore> = match config.backend {
        BackendType::Json => Box::new(JsonSnapshotStore::new(&config.snapshot_path)),
        BackendType::Sqlite => Box::new(SqliteSnapshotStore::new(&config.db_path)?),
    };
    log::info!("✅ Snapshot store ready ({})", store.backend_type());
    Ok(store)
}
