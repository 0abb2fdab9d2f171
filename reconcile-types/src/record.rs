//! Conflict versions and the resolution records written to the ledger.

use crate::{Digest, Identity, ReplicaId, Timestamp, VectorClock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    /// Version A was kept as-is.
    A,
    /// Version B was kept as-is.
    B,
    /// A merge of both versions was produced.
    Merged,
    /// The conflict was handed to human review.
    Manual,
}

impl Winner {
    /// Stable lowercase name, also used by the journal.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::Merged => "merged",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Winner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            "merged" => Ok(Self::Merged),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown winner: {other}")),
        }
    }
}

/// One side of a conflict, reduced to digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Digest of the version's field values.
    pub content_hash: Digest,
    /// Wall-clock time assigned by the producing replica.
    pub timestamp: Timestamp,
    /// Digest of the version's vector clock.
    pub vector_clock_hash: Digest,
    /// Replica that produced the version.
    pub replica_id: ReplicaId,
}

impl VersionInfo {
    /// Creates a version from precomputed digests.
    #[must_use]
    pub fn new(
        content_hash: Digest,
        timestamp: Timestamp,
        vector_clock_hash: Digest,
        replica_id: ReplicaId,
    ) -> Self {
        Self {
            content_hash,
            timestamp,
            vector_clock_hash,
            replica_id,
        }
    }

    /// Creates a version, digesting the full vector clock.
    #[must_use]
    pub fn from_clock(
        content_hash: Digest,
        timestamp: Timestamp,
        clock: &VectorClock,
        replica_id: ReplicaId,
    ) -> Self {
        Self::new(content_hash, timestamp, clock.digest(), replica_id)
    }
}

/// The unit of the audit log.
///
/// Records are append-only: once a provider or the registry has assigned
/// an id to a record, the record is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    /// Digest of the logical entity being synced.
    pub entity_id: Digest,
    /// Id of the provider that produced the record.
    pub strategy: String,
    pub winner: Winner,
    pub version_a_hash: Digest,
    pub version_b_hash: Digest,
    /// `Digest::ZERO` when no common ancestor exists.
    pub ancestor_hash: Digest,
    /// `Digest::ZERO` when unresolved.
    pub merged_hash: Digest,
    pub resolved_at: Timestamp,
    pub resolved_by: Identity,
    pub auto_resolved: bool,
    /// Human-readable explanation of the decision.
    pub details: String,
    /// Strategy payload the provider decoded, kept verbatim.
    pub extra_data: Vec<u8>,
}

impl ResolutionRecord {
    /// Returns true if the record carries a common ancestor.
    #[must_use]
    pub fn has_ancestor(&self) -> bool {
        !self.ancestor_hash.is_zero()
    }
}
