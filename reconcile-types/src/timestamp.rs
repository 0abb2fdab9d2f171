//! Wall-clock timestamps.
//!
//! Versions carry the time assigned by the replica that produced them;
//! the ledger stamps every decision with its own clock reading. Both are
//! whole seconds since the Unix epoch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Reads the system clock. A clock set before the epoch reads as zero.
    #[must_use]
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self(secs)
    }

    /// Creates a timestamp from raw seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns the raw seconds.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Signed difference `self - other` in seconds.
    #[must_use]
    pub fn delta(&self, other: &Self) -> i128 {
        i128::from(self.0) - i128::from(other.0)
    }
}

impl From<u64> for Timestamp {
    fn from(secs: u64) -> Self {
        Self(secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
