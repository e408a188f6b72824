//! Process configuration.
//!
//! Every setting has a default and can be overridden from the environment:
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `TESSERA_DIR` | storage directory (default `./.storage`) |
//! | `TESSERA_IN_MEMORY` | `1`/`true` to keep everything in memory |
//! | `TESSERA_LOG` | log filter directives (default `info`) |
//! | `TESSERA_MAX_TXN_ENTRIES` | per-transaction write limit |
//! | `TESSERA_SCAN_DEADLINE_MS` | deadline for select/delete-all/update-all |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tessera_foundation::{Error, Result};
use tessera_storage::kv::DEFAULT_MAX_TXN_ENTRIES;
use tessera_storage::{EngineOptions, StoreOptions};

/// Storage directory variable.
pub const ENV_DIR: &str = "TESSERA_DIR";
/// In-memory switch variable.
pub const ENV_IN_MEMORY: &str = "TESSERA_IN_MEMORY";
/// Log filter variable.
pub const ENV_LOG: &str = "TESSERA_LOG";
/// Transaction size limit variable.
pub const ENV_MAX_TXN_ENTRIES: &str = "TESSERA_MAX_TXN_ENTRIES";
/// Scan deadline variable, in milliseconds.
pub const ENV_SCAN_DEADLINE_MS: &str = "TESSERA_SCAN_DEADLINE_MS";

/// Runtime configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the store files.
    pub dir: PathBuf,
    /// Keep the store in memory and ignore `dir`.
    pub in_memory: bool,
    /// Log filter directives.
    pub log_filter: String,
    /// Maximum distinct keys written per transaction.
    pub max_txn_entries: usize,
    /// Deadline for callback-driven scans.
    pub scan_deadline: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".storage"),
            in_memory: false,
            log_filter: "info".to_string(),
            max_txn_entries: DEFAULT_MAX_TXN_ENTRIES,
            scan_deadline: None,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error naming the variable that failed to parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error naming the variable that failed to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = lookup(ENV_DIR).filter(|d| !d.is_empty()) {
            config.dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_IN_MEMORY) {
            config.in_memory = parse_flag(ENV_IN_MEMORY, &raw)?;
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|f| !f.is_empty()) {
            config.log_filter = filter;
        }
        if let Some(raw) = lookup(ENV_MAX_TXN_ENTRIES) {
            config.max_txn_entries = parse_number(ENV_MAX_TXN_ENTRIES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SCAN_DEADLINE_MS) {
            let millis: u64 = parse_number(ENV_SCAN_DEADLINE_MS, &raw)?;
            config.scan_deadline = (millis > 0).then(|| Duration::from_millis(millis));
        }
        Ok(config)
    }

    /// Sets the storage directory.
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Sets whether the store stays in memory.
    #[must_use]
    pub fn with_in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    /// Sets the log filter directives.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Sets the per-transaction write limit.
    #[must_use]
    pub fn with_max_txn_entries(mut self, limit: usize) -> Self {
        self.max_txn_entries = limit;
        self
    }

    /// Sets the scan deadline.
    #[must_use]
    pub fn with_scan_deadline(mut self, deadline: Duration) -> Self {
        self.scan_deadline = Some(deadline);
        self
    }

    /// Store options derived from this configuration.
    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        let options = if self.in_memory {
            StoreOptions::in_memory()
        } else {
            StoreOptions::persistent(&self.dir)
        };
        options.with_max_txn_entries(self.max_txn_entries)
    }

    /// Engine options derived from this configuration.
    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            scan_deadline: self.scan_deadline,
        }
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::invalid_argument(format!(
            "{name} must be a boolean, got {other:?}"
        ))),
    }
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        Error::invalid_argument(format!("{name} must be a non-negative integer, got {raw:?}"))
    })
}
