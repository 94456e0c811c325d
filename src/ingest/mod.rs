//! Spreadsheet ingestion
//!
//! ```text
//! SheetSource (gviz / memory)
//!     │ probe_signature            │ fetch_grid
//!     ▼                            ▼
//! discovery ──► sheet names ──► orchestrator ──► parser ──► normalizer
//!                                    │
//!                                    ▼
//!                             IngestResult ──► SnapshotStore
//! ```

pub mod discovery;
pub mod normalizer;
pub mod orchestrator;
pub mod parser;
pub mod source;
pub mod types;

pub use discovery::{discover_sheets, DiscoveryOptions};
pub use orchestrator::{ingest_all, run_with_timeout, sync_snapshot, IngestOptions, SyncReport};
pub use parser::parse_sheet;
pub use source::{GvizSource, MemorySource, Selector, SheetSource, SourceError};
pub use types::{IngestResult, Order, SheetDescriptor, SyncMeta};
