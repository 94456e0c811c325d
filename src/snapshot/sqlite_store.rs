//! SQLite snapshot backend
//!
//! Tables:
//! - `orders` - one row per order, `position` preserves ingestion order
//! - `sync_meta` - single row (`singleton = 1`), replaced on every store
//!
//! A store deletes and re-inserts everything inside one transaction, so a
//! reader never sees a mix of two runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{SnapshotError, SnapshotStore};
use crate::ingest::types::{Order, SyncMeta};

pub struct SqliteSnapshotStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSnapshotStore {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        let journal_mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !journal_mode.eq_ignore_ascii_case("wal") {
            log::warn!("⚠️  SQLite refused WAL mode, running with journal_mode={}", journal_mode);
        }
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS orders (
                position INTEGER PRIMARY KEY,
                id TEXT NOT NULL,
                date TEXT NOT NULL,
                customer_name TEXT NOT NULL,
                address_phone_notes TEXT NOT NULL,
                total REAL NOT NULL,
                deposit REAL NOT NULL,
                shipping REAL NOT NULL,
                remaining REAL NOT NULL,
                status TEXT NOT NULL,
                notes TEXT NOT NULL,
                sheet_name TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_orders_sheet ON orders(sheet_name);
            CREATE TABLE IF NOT EXISTS sync_meta (
                singleton INTEGER PRIMARY KEY CHECK (singleton = 1),
                last_sync TEXT NOT NULL,
                record_count INTEGER NOT NULL,
                sheet_names TEXT NOT NULL
            );",
        )?;

        log::info!("✅ SQLite snapshot store initialized with WAL mode");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SnapshotError> {
        self.conn
            .lock()
            .map_err(|_| SnapshotError::Database("connection mutex poisoned".to_string()))
    }

    fn read_meta(conn: &Connection) -> Result<Option<SyncMeta>, SnapshotError> {
        let row = conn
            .query_row(
                "SELECT last_sync, record_count, sheet_names FROM sync_meta WHERE singleton = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((last_sync, record_count, sheet_names)) = row else {
            return Ok(None);
        };

        let last_sync = DateTime::parse_from_rfc3339(&last_sync)
            .map_err(|e| SnapshotError::Database(format!("invalid last_sync '{}': {}", last_sync, e)))?
            .with_timezone(&Utc);

        Ok(Some(SyncMeta {
            last_sync,
            record_count: record_count as usize,
            sheet_names: serde_json::from_str(&sheet_names)?,
        }))
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn store(&self, orders: &[Order], sheet_names: &[String]) -> Result<SyncMeta, SnapshotError> {
        let meta = SyncMeta {
            last_sync: Utc::now(),
            record_count: orders.len(),
            sheet_names: sheet_names.to_vec(),
        };
        let sheet_names_json = serde_json::to_string(&meta.sheet_names)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM orders", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO orders
                 (position, id, date, customer_name, address_phone_notes, total,
                  deposit, shipping, remaining, status, notes, sheet_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for (position, order) in orders.iter().enumerate() {
                insert.execute(params![
                    position as i64,
                    order.id,
                    order.date,
                    order.customer_name,
                    order.address_phone_notes,
                    order.total,
                    order.deposit,
                    order.shipping,
                    order.remaining,
                    order.status,
                    order.notes,
                    order.sheet_name,
                ])?;
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO sync_meta (singleton, last_sync, record_count, sheet_names)
             VALUES (1, ?1, ?2, ?3)",
            params![meta.last_sync.to_rfc3339(), meta.record_count as i64, sheet_names_json],
        )?;

        tx.commit()?;

        log::debug!("✅ Replaced snapshot with {} orders", orders.len());
        Ok(meta)
    }

    async fn load(&self) -> Result<Option<Vec<Order>>, SnapshotError> {
        let conn = self.lock()?;
        if Self::read_meta(&conn)?.is_none() {
            return Ok(None);
        }

        let mut stmt = conn.prepare(
            "SELECT id, date, customer_name, address_phone_notes, total, deposit,
                    shipping, remaining, status, notes, sheet_name
             FROM orders ORDER BY position",
        )?;
        let orders = stmt
            .query_map([], |row| {
                Ok(Order {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    customer_name: row.get(2)?,
                    address_phone_notes: row.get(3)?,
                    total: row.get(4)?,
                    deposit: row.get(5)?,
                    shipping: row.get(6)?,
                    remaining: row.get(7)?,
                    status: row.get(8)?,
                    notes: row.get(9)?,
                    sheet_name: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        log::info!("Loaded {} orders from SQLite snapshot", orders.len());
        Ok(Some(orders))
    }

    async fn load_meta(&self) -> Result<Option<SyncMeta>, SnapshotError> {
        let conn = self.lock()?;
        Self::read_meta(&conn)
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}
