use {
    super::{SnapshotError, SnapshotStore},
    crate::ingest::types::{Order, SyncMeta},
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    std::{
        fs,
        path::{Path, PathBuf},
    },
};

/// Snapshot file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub meta: SyncMeta,
    pub orders: Vec<Order>,
}

/// Metadata-only view of the same file (orders are skipped while parsing)
#[derive(Deserialize)]
struct MetaOnly {
    meta: SyncMeta,
}

/// JSON file backend
pub struct JsonSnapshotStore {
    file_path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.file_path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn read_if_present(&self) -> Result<Option<String>, SnapshotError> {
        if !self.file_path.exists() {
            log::info!("No existing snapshot file found: {}", self.file_path.display());
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.file_path)?))
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn store(&self, orders: &[Order], sheet_names: &[String]) -> Result<SyncMeta, SnapshotError> {
        let snapshot = SnapshotFile {
            meta: SyncMeta {
                last_sync: chrono::Utc::now(),
                record_count: orders.len(),
                sheet_names: sheet_names.to_vec(),
            },
            orders: orders.to_vec(),
        };

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Readers see either the old file or the new one, never a torn write
        let json = serde_json::to_string_pretty(&snapshot)?;
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.file_path)?;

        log::debug!("Saved {} orders to {}", orders.len(), self.file_path.display());
        Ok(snapshot.meta)
    }

    async fn load(&self) -> Result<Option<Vec<Order>>, SnapshotError> {
        let Some(json) = self.read_if_present()? else {
            return Ok(None);
        };
        let snapshot: SnapshotFile = serde_json::from_str(&json)?;

        log::info!("Loaded {} orders from {}", snapshot.orders.len(), self.file_path.display());
        Ok(Some(snapshot.orders))
    }

    async fn load_meta(&self) -> Result<Option<SyncMeta>, SnapshotError> {
        let Some(json) = self.read_if_present()? else {
            return Ok(None);
        };
        let meta: MetaOnly = serde_json::from_str(&json)?;
        Ok(Some(meta.meta))
    }

    fn backend_type(&self) -> &'static str {
        "JSON"
    }
}
