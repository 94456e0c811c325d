//! Record types produced by the ingestion pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::normalizer::year_from_sheet_name;

/// One normalized order row
///
/// `date` is either a full `YYYY-MM-DD` string or empty. Monetary fields are
/// always finite; unreadable cells become `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub date: String,
    pub customer_name: String,
    pub address_phone_notes: String,
    pub total: f64,
    pub deposit: f64,
    pub shipping: f64,
    pub remaining: f64,
    pub status: String,
    pub notes: String,
    pub sheet_name: String,
}

/// A year-sheet chosen by discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetDescriptor {
    pub name: String,
    pub year: i32,
}

impl SheetDescriptor {
    pub fn new(name: impl Into<String>, current_year: i32) -> Self {
        let name = name.into();
        let year = year_from_sheet_name(&name, current_year);
        Self { name, year }
    }
}

/// Output of one full ingestion run
#[derive(Debug, Clone, Default)]
pub struct IngestResult {
    pub orders: Vec<Order>,
    pub sheet_names: Vec<String>,
}

/// Metadata written alongside every snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMeta {
    pub last_sync: DateTime<Utc>,
    pub record_count: usize,
    pub sheet_names: Vec<String>,
}
