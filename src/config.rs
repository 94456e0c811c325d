//! Configuration from environment variables
//!
//! Environment variables (ingestion):
//! - `GOOGLE_SHEET_ID` - spreadsheet document id (required)
//! - `GOOGLE_SHEET_GID` - gid expected behind the default view (default: 0)
//! - `SHEETS_BASE_URL` - gviz base URL (default: https://docs.google.com/spreadsheets/d)
//! - `SHEET_NAME_PREFIX` - year-sheet name prefix (default: "Order ")
//! - `FETCH_TIMEOUT_SECS` - per-request timeout (default: 10)
//! - `INGEST_TIMEOUT_SECS` - whole-run timeout (default: 60)
//! - `SYNC_INTERVAL_SECS` - enables periodic sync when set
//!
//! Environment variables (snapshot):
//! - `ORDERFLOW_DB_PATH` - SQLite snapshot path (default: data/orderflow.db) - used with --backend sqlite
//! - `ORDERFLOW_SNAPSHOT_PATH` - JSON snapshot path (default: data/orders.json) - used with --backend json
//! - `TOP_CUSTOMERS_LIMIT` - ranking length for reports (default: 10)

use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://docs.google.com/spreadsheets/d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Json,
    Sqlite,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings needed to reach the spreadsheet and run an ingestion
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub sheet_id: String,
    pub target_gid: String,
    pub base_url: String,
    pub sheet_prefix: String,
    pub fetch_timeout: Duration,
    pub ingest_timeout: Duration,
    pub sync_interval: Option<Duration>,
}

/// Where snapshots live and how reports are shaped
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: BackendType,
    pub db_path: String,
    pub snapshot_path: String,
    pub top_customers_limit: usize,
}

/// Read a numeric variable, falling back to `default` when unset or unparseable
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Invalid {} '{}', defaulting to {}", key, raw, default);
            default
        }),
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sheet_id = lookup("GOOGLE_SHEET_ID")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingVariable("GOOGLE_SHEET_ID".to_string()))?;

        let base_url = lookup("SHEETS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "SHEETS_BASE_URL must start with http:// or https://".to_string(),
            ));
        }

        let target_gid = lookup("GOOGLE_SHEET_GID").unwrap_or_else(|| "0".to_string());
        if target_gid.is_empty() || !target_gid.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue(format!(
                "GOOGLE_SHEET_GID must be numeric, got '{}'",
                target_gid
            )));
        }

        let sheet_prefix = lookup("SHEET_NAME_PREFIX").unwrap_or_else(|| "Order ".to_string());

        let fetch_timeout = Duration::from_secs(parse_or(&lookup, "FETCH_TIMEOUT_SECS", 10u64));
        let ingest_timeout = Duration::from_secs(parse_or(&lookup, "INGEST_TIMEOUT_SECS", 60u64));

        let sync_interval = match lookup("SYNC_INTERVAL_SECS") {
            None => None,
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    ConfigError::InvalidValue(format!("SYNC_INTERVAL_SECS must be an integer, got '{}'", raw))
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue(
                        "SYNC_INTERVAL_SECS must be greater than zero".to_string(),
                    ));
                }
                Some(Duration::from_secs(secs))
            }
        };

        Ok(Self {
            sheet_id,
            target_gid,
            base_url,
            sheet_prefix,
            fetch_timeout,
            ingest_timeout,
            sync_interval,
        })
    }
}

impl StoreConfig {
    pub fn from_env(args: &[String]) -> Self {
        Self::from_lookup(args, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(args: &[String], lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            backend: parse_backend_from_args(args),
            db_path: lookup("ORDERFLOW_DB_PATH").unwrap_or_else(|| "data/orderflow.db".to_string()),
            snapshot_path: lookup("ORDERFLOW_SNAPSHOT_PATH")
                .unwrap_or_else(|| "data/orders.json".to_string()),
            top_customers_limit: parse_or(&lookup, "TOP_CUSTOMERS_LIMIT", 10usize),
        }
    }
}

/// Value following `flag` on the command line, if any
pub fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|x| x == flag)
        .and_then(|idx| args.get(idx + 1))
        .cloned()
}

pub fn parse_backend_from_args(args: &[String]) -> BackendType {
    match arg_value(args, "--backend").as_deref() {
        Some("sqlite") => BackendType::Sqlite,
        Some("json") => BackendType::Json,
        Some(other) => {
            log::warn!("Unknown --backend '{}', defaulting to json", other);
            BackendType::Json
        }
        None => BackendType::Json,
    }
}
