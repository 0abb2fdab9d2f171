//! The conflict input and the provider plugin contract.

use crate::error::StrategyResult;
use crate::ledger::PreparedResolution;
use crate::providers::field_merge::FIELD_MERGE;
use crate::providers::three_way::THREE_WAY_MERGE;
use reconcile_types::{Digest, Identity, ResolutionRecord, VersionInfo, Winner};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    A,
    B,
}

impl Side {
    #[must_use]
    pub const fn winner(self) -> Winner {
        match self {
            Self::A => Winner::A,
            Self::B => Winner::B,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "a",
            Self::B => "b",
        })
    }
}

/// Two divergent versions of one entity, plus whatever the caller's
/// diff/merge computation produced for the chosen strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub entity_id: Digest,
    pub version_a: VersionInfo,
    pub version_b: VersionInfo,
    /// `Digest::ZERO` when no common ancestor is known.
    pub ancestor_hash: Digest,
    /// Strategy-defined payload; see [`crate::payload`].
    pub extra_data: Vec<u8>,
}

impl Conflict {
    /// Creates a conflict with no ancestor and no payload.
    #[must_use]
    pub fn new(entity_id: Digest, version_a: VersionInfo, version_b: VersionInfo) -> Self {
        Self {
            entity_id,
            version_a,
            version_b,
            ancestor_hash: Digest::ZERO,
            extra_data: Vec::new(),
        }
    }

    /// Sets the common ancestor digest.
    #[must_use]
    pub fn with_ancestor(mut self, ancestor_hash: Digest) -> Self {
        self.ancestor_hash = ancestor_hash;
        self
    }

    /// Sets the strategy payload.
    #[must_use]
    pub fn with_extra_data(mut self, extra_data: impl Into<Vec<u8>>) -> Self {
        self.extra_data = extra_data.into();
        self
    }

    /// Returns true if a common ancestor is known.
    #[must_use]
    pub fn has_ancestor(&self) -> bool {
        !self.ancestor_hash.is_zero()
    }
}

/// Interface every resolution strategy implements.
///
/// Providers are trusted plugins registered by an administrator. They are
/// shared behind `Arc` and must guard their own state.
///
/// Resolution is split in two so a caller can persist the record between
/// the phases: [`prepare`](Self::prepare) validates and builds the record
/// without touching provider state, [`commit`](Self::commit) writes it and
/// cannot fail.
pub trait ResolutionProvider: Send + Sync {
    /// Fixed strategy id, written into every record this provider produces.
    fn id(&self) -> &str;

    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Validates the conflict and builds the record it would produce.
    /// Must not change any provider state.
    fn prepare(&self, caller: Identity, conflict: &Conflict) -> StrategyResult<PreparedResolution>;

    /// Writes a resolution returned by this provider's `prepare` and
    /// returns its local id.
    fn commit(&self, prepared: PreparedResolution) -> u64;

    /// Prepares and immediately commits.
    fn resolve(&self, caller: Identity, conflict: &Conflict) -> StrategyResult<u64> {
        let prepared = self.prepare(caller, conflict)?;
        Ok(self.commit(prepared))
    }

    /// Whether this strategy can decide without a human, judged only from
    /// the inputs available before any merge is computed. Never fails.
    fn can_auto_resolve(
        &self,
        version_a: &VersionInfo,
        version_b: &VersionInfo,
        ancestor_hash: &Digest,
    ) -> bool;

    /// Looks up a local record. Unknown ids yield `None`.
    fn get_resolution(&self, resolution_id: u64) -> Option<ResolutionRecord>;

    /// Number of records written so far (also the highest local id).
    fn resolution_count(&self) -> u64;
}

/// Recommends a strategy id for a conflict.
///
/// With a common ancestor, three-way merge; otherwise field merge for
/// partial auto-resolution. This is advice only; the registry never
/// dispatches on it implicitly.
#[must_use]
pub fn suggest_strategy(ancestor_hash: &Digest) -> &'static str {
    if ancestor_hash.is_zero() {
        FIELD_MERGE
    } else {
        THREE_WAY_MERGE
    }
}
