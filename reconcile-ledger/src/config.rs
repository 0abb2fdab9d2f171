//! Ledger configuration, read from `ledger.toml`.

use crate::error::{LedgerError, LedgerResult};
use reconcile_strategies::{AuditBus, Side};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Ledger configuration.
///
/// ```toml
/// event_capacity = 1024
/// journal_path = "/var/lib/reconcile/journal.db"
/// builtin_strategies = true
/// tie_breaker = "a"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Audit events buffered per subscriber.
    pub event_capacity: usize,
    /// SQLite journal location; `None` keeps the log in memory only.
    pub journal_path: Option<PathBuf>,
    /// Register the five built-in strategies under their canonical ids.
    pub builtin_strategies: bool,
    /// Side the last-writer-wins strategy picks when timestamps and
    /// vector clocks are both identical.
    pub tie_breaker: Side,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            event_capacity: AuditBus::DEFAULT_CAPACITY,
            journal_path: None,
            builtin_strategies: true,
            tie_breaker: Side::A,
        }
    }
}

impl LedgerConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(contents: &str) -> LedgerResult<Self> {
        toml::from_str(contents).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Loads configuration from a file. Falls back to defaults with a
    /// warning when the file is missing or unreadable.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No ledger config at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded ledger config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse ledger config {:?}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read ledger config {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}
