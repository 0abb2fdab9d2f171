//! Typed `extra_data` payloads.
//!
//! The caller's diff/merge computation summarizes its result as one of these
//! structs, encoded as JSON. Providers decode the payload at the boundary;
//! an empty payload is `MissingMergeMetadata` and one that does not match
//! the schema is `MalformedMetadata`.

use crate::error::{StrategyError, StrategyResult};
use crate::providers::crdt_merge::CrdtKind;
use reconcile_types::Digest;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Encoding shared by all payload types.
pub trait MergePayload: Serialize + DeserializeOwned {
    /// Encodes the payload as `extra_data` bytes.
    fn encode(&self) -> Vec<u8> {
        // Payloads are flat structs of integers and digests; serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Decodes a required payload for `strategy`.
pub(crate) fn decode_required<T: MergePayload>(strategy: &str, data: &[u8]) -> StrategyResult<T> {
    if data.is_empty() {
        return Err(StrategyError::MissingMergeMetadata {
            strategy: strategy.to_string(),
        });
    }
    serde_json::from_slice(data).map_err(|source| StrategyError::MalformedMetadata {
        strategy: strategy.to_string(),
        source,
    })
}

/// Field-level merge accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldMergeSummary {
    pub total_fields: u32,
    /// Fields changed only on side A and taken from it.
    pub auto_merged_from_a: u32,
    /// Fields changed only on side B and taken from it.
    pub auto_merged_from_b: u32,
    pub unchanged_fields: u32,
    /// Fields changed on both sides to different values.
    pub true_conflict_count: u32,
    /// True conflicts settled by a configured field preference.
    pub resolved_by_preference: u32,
    pub merged_content_hash: Digest,
}

impl MergePayload for FieldMergeSummary {}

impl FieldMergeSummary {
    /// True conflicts left without a preference.
    #[must_use]
    pub fn unresolved_conflicts(&self) -> u32 {
        self.true_conflict_count.saturating_sub(self.resolved_by_preference)
    }
}

/// Three-way diff classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThreeWaySummary {
    /// Changes between ancestor and A.
    pub diff_a_count: u32,
    /// Changes between ancestor and B.
    pub diff_b_count: u32,
    /// Fields changed on both sides to different values.
    pub overlapping_changes: u32,
    /// Non-overlapping changes applied to the merge.
    pub clean_merges: u32,
    pub merged_content_hash: Digest,
}

impl MergePayload for ThreeWaySummary {}

/// Per-field-type accounting of a CRDT merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CrdtMergeSummary {
    pub lww_register_fields: u32,
    pub pn_counter_fields: u32,
    pub or_set_fields: u32,
    pub rga_fields: u32,
    pub total_fields: u32,
    pub merged_clock_hash: Digest,
    pub merged_content_hash: Digest,
}

impl MergePayload for CrdtMergeSummary {}

impl CrdtMergeSummary {
    /// Number of fields merged as `kind`.
    #[must_use]
    pub fn count(&self, kind: CrdtKind) -> u32 {
        match kind {
            CrdtKind::LwwRegister => self.lww_register_fields,
            CrdtKind::PnCounter => self.pn_counter_fields,
            CrdtKind::OrSet => self.or_set_fields,
            CrdtKind::Rga => self.rga_fields,
        }
    }

    /// Sum of the four type counts, without overflow.
    #[must_use]
    pub fn type_sum(&self) -> u64 {
        CrdtKind::ALL.iter().map(|k| u64::from(self.count(*k))).sum()
    }
}

/// Triage hint for the manual queue. Optional: a missing or unreadable
/// hint falls back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewHint {
    /// Higher is more urgent.
    pub priority: i32,
    pub conflicting_field_count: u32,
}

impl MergePayload for ReviewHint {}

impl ReviewHint {
    /// Decodes a hint, falling back to defaults for empty or short input.
    #[must_use]
    pub fn decode_lenient(data: &[u8]) -> Self {
        if data.is_empty() {
            return Self::default();
        }
        serde_json::from_slice(data).unwrap_or_default()
    }
}
