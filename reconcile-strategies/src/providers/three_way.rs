//! Three-way merge classification.
//!
//! The caller diffs both versions against the common ancestor and merges
//! the non-overlapping changes. Overlapping changes (same field changed on
//! both sides to different values) prevent automatic resolution.
//!
//! Without an ancestor the caller can still produce a best-effort two-way
//! merge; it is recorded as degraded rather than rejected.

use crate::audit::AuditBus;
use crate::conflict::{Conflict, ResolutionProvider};
use crate::error::StrategyResult;
use crate::ledger::{lock, PreparedResolution, ProviderLedger, RecordDraft, Staged};
use crate::payload::{decode_required, ThreeWaySummary};
use reconcile_types::{Digest, Identity, ResolutionRecord, VersionInfo, Winner};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};

/// Canonical strategy id.
pub const THREE_WAY_MERGE: &str = "three_way_merge";

/// Cumulative totals across all recorded merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreeWayStats {
    pub clean_merges: u64,
    pub overlapping_changes: u64,
    /// Merges recorded without a common ancestor.
    pub degraded: u64,
}

#[derive(Debug)]
struct ThreeWayState {
    ledger: ProviderLedger,
    metadata: HashMap<u64, ThreeWaySummary>,
    stats: ThreeWayStats,
}

/// Records three-way merges.
#[derive(Debug)]
pub struct ThreeWayMergeProvider {
    state: Mutex<ThreeWayState>,
}

impl ThreeWayMergeProvider {
    pub fn new(bus: AuditBus) -> Self {
        Self {
            state: Mutex::new(ThreeWayState {
                ledger: ProviderLedger::new(THREE_WAY_MERGE, bus),
                metadata: HashMap::new(),
                stats: ThreeWayStats::default(),
            }),
        }
    }

    /// The summary recorded with a local resolution.
    pub fn metadata(&self, resolution_id: u64) -> Option<ThreeWaySummary> {
        lock(&self.state).metadata.get(&resolution_id).copied()
    }

    pub fn stats(&self) -> ThreeWayStats {
        lock(&self.state).stats
    }
}

fn describe(summary: &ThreeWaySummary, has_ancestor: bool) -> String {
    let mut details = if has_ancestor {
        format!(
            "Three-way merge against ancestor. Diff A: {} change(s). Diff B: {} change(s). Clean merges applied: {}.",
            summary.diff_a_count, summary.diff_b_count, summary.clean_merges
        )
    } else {
        format!(
            "Three-way merge degraded: no common ancestor available; recorded best-effort merge with {} clean change(s).",
            summary.clean_merges
        )
    };
    if summary.overlapping_changes > 0 {
        details.push_str(&format!(
            " Overlapping changes on {} field(s); manual resolution required.",
            summary.overlapping_changes
        ));
    } else {
        details.push_str(" No overlapping changes.");
    }
    details
}

impl ResolutionProvider for ThreeWayMergeProvider {
    fn id(&self) -> &str {
        THREE_WAY_MERGE
    }

    fn display_name(&self) -> &str {
        "Three-Way Merge"
    }

    fn prepare(&self, caller: Identity, conflict: &Conflict) -> StrategyResult<PreparedResolution> {
        let summary: ThreeWaySummary = decode_required(THREE_WAY_MERGE, &conflict.extra_data)?;
        let has_ancestor = conflict.has_ancestor();
        let auto_resolved = summary.overlapping_changes == 0;

        let record = lock(&self.state).ledger.draft(
            caller,
            conflict,
            RecordDraft {
                winner: Winner::Merged,
                merged_hash: summary.merged_content_hash,
                auto_resolved,
                details: describe(&summary, has_ancestor),
            },
        );
        Ok(PreparedResolution::staged(record, Staged::ThreeWay(summary)))
    }

    fn commit(&self, prepared: PreparedResolution) -> u64 {
        let (record, staged) = prepared.into_parts();
        let entity = record.entity_id;
        let has_ancestor = record.has_ancestor();
        let auto_resolved = record.auto_resolved;
        if !has_ancestor {
            warn!(entity = %entity, "three-way merge without ancestor");
        }

        let mut state = lock(&self.state);
        let id = state.ledger.commit(record);
        if !has_ancestor {
            state.stats.degraded += 1;
        }
        if let Staged::ThreeWay(summary) = staged {
            state.metadata.insert(id, summary);
            state.stats.clean_merges += u64::from(summary.clean_merges);
            state.stats.overlapping_changes += u64::from(summary.overlapping_changes);
            info!(
                resolution_id = id,
                entity = %entity,
                overlapping = summary.overlapping_changes,
                auto_resolved,
                "three-way merge recorded"
            );
        }
        id
    }

    /// True only when an ancestor is known. This does not predict the
    /// `auto_resolved` flag of the eventual record.
    fn can_auto_resolve(&self, _a: &VersionInfo, _b: &VersionInfo, ancestor: &Digest) -> bool {
        !ancestor.is_zero()
    }

    fn get_resolution(&self, resolution_id: u64) -> Option<ResolutionRecord> {
        lock(&self.state).ledger.get(resolution_id)
    }

    fn resolution_count(&self) -> u64 {
        lock(&self.state).ledger.count()
    }
}
