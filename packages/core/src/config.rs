//! Runtime configuration for the outliner engine
//!
//! `OutlinerConfig` is built once at startup (defaults, then environment
//! overrides) and handed to `DatabaseService` and `NodeService`.
//!
//! # Environment Variables
//!
//! - `OUTLINER_DB_PATH`: Database file (default: `~/.outliner/database/outliner.db`)
//! - `OUTLINER_BUSY_TIMEOUT_MS`: SQLite busy timeout (default: 5000)
//! - `OUTLINER_MAX_RETRIES`: Conflict retries per operation (default: 3)
//! - `OUTLINER_RETRY_BACKOFF_MS`: First retry delay, doubled each attempt (default: 10)

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Upper bound for the busy timeout; longer waits hide real contention problems
const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;

/// Upper bound for conflict retries (backoff doubles per attempt)
const MAX_CONFLICT_RETRIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlinerConfig {
    /// Database file location
    pub database_path: PathBuf,

    /// How long a connection waits on a locked database before failing
    pub busy_timeout_ms: u64,

    /// How many times a conflicting transaction is re-run (0 = single attempt)
    pub max_conflict_retries: usize,

    /// Delay before the first retry
    pub retry_backoff_ms: u64,
}

impl Default for OutlinerConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            busy_timeout_ms: 5000,
            max_conflict_retries: 3,
            retry_backoff_ms: 10,
        }
    }
}

impl OutlinerConfig {
    /// Config pointing at an explicit database file, other settings default
    pub fn with_database_path(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `OUTLINER_*` environment variables
    ///
    /// Unparseable values are rejected rather than silently ignored.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Ok(path) = env::var("OUTLINER_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(value) = parse_env("OUTLINER_BUSY_TIMEOUT_MS")? {
            config.busy_timeout_ms = value;
        }
        if let Some(value) = parse_env("OUTLINER_MAX_RETRIES")? {
            config.max_conflict_retries = value;
        }
        if let Some(value) = parse_env("OUTLINER_RETRY_BACKOFF_MS")? {
            config.retry_backoff_ms = value;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.database_path.as_os_str().is_empty() {
            return Err("database_path cannot be empty".to_string());
        }

        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(format!(
                "busy_timeout_ms cannot exceed {}",
                MAX_BUSY_TIMEOUT_MS
            ));
        }

        if self.max_conflict_retries > MAX_CONFLICT_RETRIES {
            return Err(format!(
                "max_conflict_retries cannot exceed {}",
                MAX_CONFLICT_RETRIES
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("{} has an invalid value: '{}'", name, raw)),
        Err(_) => Ok(None),
    }
}

/// `~/.outliner/database/outliner.db`, or a relative path when no home directory exists
fn default_database_path() -> PathBuf {
    let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(".outliner").join("database").join("outliner.db")
}
