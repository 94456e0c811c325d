use std::time::Duration;

use crate::config::ConfigError;
use crate::ingest::source::SourceError;
use crate::snapshot::SnapshotError;

/// Why an ingestion run failed. Any of these leaves the previous snapshot in place.
#[derive(Debug)]
pub enum IngestError {
    Config(ConfigError),
    Discovery(SourceError),
    Source { sheet: String, source: SourceError },
    Snapshot(SnapshotError),
    Task(String),
    Timeout(Duration),
}

impl From<ConfigError> for IngestError {
    fn from(err: ConfigError) -> Self {
        IngestError::Config(err)
    }
}

impl From<SnapshotError> for IngestError {
    fn from(err: SnapshotError) -> Self {
        IngestError::Snapshot(err)
    }
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Config(e) => write!(f, "Configuration error: {}", e),
            IngestError::Discovery(e) => write!(f, "Sheet discovery failed: {}", e),
            IngestError::Source { sheet, source } => {
                write!(f, "Failed to fetch sheet \"{}\": {}", sheet, source)
            }
            IngestError::Snapshot(e) => write!(f, "Snapshot write failed: {}", e),
            IngestError::Task(e) => write!(f, "Fetch task failed: {}", e),
            IngestError::Timeout(limit) => {
                write!(f, "Ingestion did not finish within {}s", limit.as_secs())
            }
        }
    }
}

impl std::error::Error for IngestError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_sheet() {
        let err = IngestError::Source {
            sheet: "Order 2025".to_string(),
            source: SourceError::Http { status: 404, target: "sheet \"Order 2025\"".to_string() },
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch sheet \"Order 2025\": HTTP 404 for sheet \"Order 2025\""
        );

        let timeout = IngestError::Timeout(Duration::from_secs(60));
        assert_eq!(timeout.to_string(), "Ingestion did not finish within 60s");
    }

    #[test]
    fn test_config_error_converts() {
        let err: IngestError = ConfigError::MissingVariable("GOOGLE_SHEET_ID".to_string()).into();
        assert!(err.to_string().contains("GOOGLE_SHEET_ID"));
    }
}
