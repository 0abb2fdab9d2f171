//! CRDT merge bookkeeping.
//!
//! CRDT merges converge by construction, so this strategy always resolves
//! automatically. The caller reports how many fields were merged as each
//! CRDT type; the counts must add up to the field total or the resolution
//! is rejected before anything is written.
//!
//! The merged vector-clock digest is remembered per entity so replicas can
//! later confirm they converged on the same state without re-running the
//! merge (see [`CrdtMergeProvider::verify_merge`]).

use crate::audit::AuditBus;
use crate::conflict::{Conflict, ResolutionProvider};
use crate::error::{StrategyError, StrategyResult};
use crate::ledger::{lock, PreparedResolution, ProviderLedger, RecordDraft, Staged};
use crate::payload::{decode_required, CrdtMergeSummary};
use reconcile_types::{Digest, Identity, ResolutionRecord, VersionInfo, Winner};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Canonical strategy id.
pub const CRDT_MERGE: &str = "crdt_merge";

/// CRDT type a field was merged as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrdtKind {
    /// Last-writer-wins register for scalars.
    LwwRegister,
    /// Positive-negative counter for numbers.
    PnCounter,
    /// Observed-remove set for collections.
    OrSet,
    /// Replicated growable array for sequences and text.
    Rga,
}

impl CrdtKind {
    pub const ALL: [CrdtKind; 4] = [Self::LwwRegister, Self::PnCounter, Self::OrSet, Self::Rga];

    const fn index(self) -> usize {
        match self {
            Self::LwwRegister => 0,
            Self::PnCounter => 1,
            Self::OrSet => 2,
            Self::Rga => 3,
        }
    }
}

impl fmt::Display for CrdtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LwwRegister => "lww_register",
            Self::PnCounter => "pn_counter",
            Self::OrSet => "or_set",
            Self::Rga => "rga",
        })
    }
}

#[derive(Debug)]
struct CrdtState {
    ledger: ProviderLedger,
    metadata: HashMap<u64, CrdtMergeSummary>,
    /// Latest merged vector-clock digest per entity.
    entity_clocks: HashMap<Digest, Digest>,
    kind_totals: [u64; 4],
}

/// Records CRDT merges and tracks per-entity convergence.
#[derive(Debug)]
pub struct CrdtMergeProvider {
    state: Mutex<CrdtState>,
}

impl CrdtMergeProvider {
    pub fn new(bus: AuditBus) -> Self {
        Self {
            state: Mutex::new(CrdtState {
                ledger: ProviderLedger::new(CRDT_MERGE, bus),
                metadata: HashMap::new(),
                entity_clocks: HashMap::new(),
                kind_totals: [0; 4],
            }),
        }
    }

    /// Checks that the last recorded merge for `entity_id` produced the
    /// `expected` vector-clock digest. False for entities never merged here.
    pub fn verify_merge(&self, entity_id: &Digest, expected: &Digest) -> bool {
        let matches = lock(&self.state).entity_clocks.get(entity_id) == Some(expected);
        debug!(entity = %entity_id, matches, "merge verification");
        matches
    }

    /// Latest merged vector-clock digest for an entity.
    pub fn entity_clock(&self, entity_id: &Digest) -> Option<Digest> {
        lock(&self.state).entity_clocks.get(entity_id).copied()
    }

    /// Total fields merged as `kind` across all resolutions.
    pub fn kind_total(&self, kind: CrdtKind) -> u64 {
        lock(&self.state).kind_totals[kind.index()]
    }

    /// The summary recorded with a local resolution.
    pub fn metadata(&self, resolution_id: u64) -> Option<CrdtMergeSummary> {
        lock(&self.state).metadata.get(&resolution_id).copied()
    }
}

impl ResolutionProvider for CrdtMergeProvider {
    fn id(&self) -> &str {
        CRDT_MERGE
    }

    fn display_name(&self) -> &str {
        "CRDT Merge (Conflict-Free)"
    }

    fn prepare(&self, caller: Identity, conflict: &Conflict) -> StrategyResult<PreparedResolution> {
        let summary: CrdtMergeSummary = decode_required(CRDT_MERGE, &conflict.extra_data)?;
        let sum = summary.type_sum();
        let total = u64::from(summary.total_fields);
        if sum != total {
            warn!(entity = %conflict.entity_id, sum, total, "CRDT merge rejected");
            return Err(StrategyError::InconsistentFieldCounts { sum, total });
        }

        let details = format!(
            "CRDT merge across {} fields: {} {}, {} {}, {} {}, {} {}. Convergence guaranteed.",
            summary.total_fields,
            summary.lww_register_fields,
            CrdtKind::LwwRegister,
            summary.pn_counter_fields,
            CrdtKind::PnCounter,
            summary.or_set_fields,
            CrdtKind::OrSet,
            summary.rga_fields,
            CrdtKind::Rga,
        );

        let record = lock(&self.state).ledger.draft(
            caller,
            conflict,
            RecordDraft {
                winner: Winner::Merged,
                merged_hash: summary.merged_content_hash,
                auto_resolved: true,
                details,
            },
        );
        Ok(PreparedResolution::staged(record, Staged::Crdt(summary)))
    }

    fn commit(&self, prepared: PreparedResolution) -> u64 {
        let (record, staged) = prepared.into_parts();
        let entity = record.entity_id;

        let mut state = lock(&self.state);
        let id = state.ledger.commit(record);
        if let Staged::Crdt(summary) = staged {
            state.metadata.insert(id, summary);
            state.entity_clocks.insert(entity, summary.merged_clock_hash);
            for kind in CrdtKind::ALL {
                state.kind_totals[kind.index()] += u64::from(summary.count(kind));
            }
            info!(resolution_id = id, entity = %entity, fields = summary.total_fields, "CRDT merge recorded");
        }
        id
    }

    fn can_auto_resolve(&self, _a: &VersionInfo, _b: &VersionInfo, _ancestor: &Digest) -> bool {
        true
    }

    fn get_resolution(&self, resolution_id: u64) -> Option<ResolutionRecord> {
        lock(&self.state).ledger.get(resolution_id)
    }

    fn resolution_count(&self) -> u64 {
        lock(&self.state).ledger.count()
    }
}
