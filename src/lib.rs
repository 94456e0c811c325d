pub mod aggregator;
pub mod config;
pub mod error;
pub mod ingest;
pub mod snapshot;

pub use error::IngestError;
