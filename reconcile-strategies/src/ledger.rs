//! Local record table shared by all providers.

use crate::audit::AuditBus;
use crate::conflict::Conflict;
use crate::payload::{CrdtMergeSummary, FieldMergeSummary, ReviewHint, ThreeWaySummary};
use reconcile_types::{AuditEvent, Digest, EventSource, Identity, ResolutionRecord, Timestamp, Winner};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The strategy-specific part of a record; the ledger fills in the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    pub winner: Winner,
    pub merged_hash: Digest,
    pub auto_resolved: bool,
    pub details: String,
}

/// Provider-private state carried from `prepare` to `commit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Staged {
    None,
    Lww { tie_break: bool },
    FieldMerge(FieldMergeSummary),
    ThreeWay(ThreeWaySummary),
    Crdt(CrdtMergeSummary),
    Review(ReviewHint),
}

/// A validated resolution that has not been written yet.
///
/// Only meaningful to the provider whose `prepare` produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedResolution {
    record: ResolutionRecord,
    staged: Staged,
}

impl PreparedResolution {
    /// Wraps a record that needs no provider-private state on commit.
    #[must_use]
    pub fn new(record: ResolutionRecord) -> Self {
        Self {
            record,
            staged: Staged::None,
        }
    }

    pub(crate) fn staged(record: ResolutionRecord, staged: Staged) -> Self {
        Self { record, staged }
    }

    /// The record `commit` will store, exactly as it will be stored.
    #[must_use]
    pub fn record(&self) -> &ResolutionRecord {
        &self.record
    }

    #[must_use]
    pub fn into_record(self) -> ResolutionRecord {
        self.record
    }

    pub(crate) fn into_parts(self) -> (ResolutionRecord, Staged) {
        (self.record, self.staged)
    }
}

/// A provider's append-only table of resolution records.
///
/// Local ids start at 1 and increase by one per record. Building every
/// record here gives all strategies identical output shape.
#[derive(Debug)]
pub struct ProviderLedger {
    strategy: String,
    bus: AuditBus,
    records: Vec<ResolutionRecord>,
}

impl ProviderLedger {
    /// Creates an empty ledger for the given strategy id.
    pub fn new(strategy: impl Into<String>, bus: AuditBus) -> Self {
        Self {
            strategy: strategy.into(),
            bus,
            records: Vec::new(),
        }
    }

    /// The strategy id stamped on every record.
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Builds the record for a conflict without storing it.
    pub fn draft(&self, caller: Identity, conflict: &Conflict, draft: RecordDraft) -> ResolutionRecord {
        ResolutionRecord {
            entity_id: conflict.entity_id,
            strategy: self.strategy.clone(),
            winner: draft.winner,
            version_a_hash: conflict.version_a.content_hash,
            version_b_hash: conflict.version_b.content_hash,
            ancestor_hash: conflict.ancestor_hash,
            merged_hash: draft.merged_hash,
            resolved_at: Timestamp::now(),
            resolved_by: caller,
            auto_resolved: draft.auto_resolved,
            details: draft.details,
            extra_data: conflict.extra_data.clone(),
        }
    }

    /// Appends a record, publishes a provider-sourced `ConflictResolved`
    /// event and returns the new local id.
    pub fn commit(&mut self, record: ResolutionRecord) -> u64 {
        let event = AuditEvent::ConflictResolved {
            source: EventSource::Provider(self.strategy.clone()),
            resolution_id: self.records.len() as u64 + 1,
            entity_id: record.entity_id,
            strategy: self.strategy.clone(),
            winner: record.winner,
            auto_resolved: record.auto_resolved,
            resolved_at: record.resolved_at,
        };

        self.records.push(record);
        self.bus.publish(event);
        self.records.len() as u64
    }

    /// Returns a copy of a record; `None` for ids never issued.
    pub fn get(&self, resolution_id: u64) -> Option<ResolutionRecord> {
        let index = usize::try_from(resolution_id.checked_sub(1)?).ok()?;
        self.records.get(index).cloned()
    }

    /// Number of records, which is also the highest issued id.
    pub fn count(&self) -> u64 {
        self.records.len() as u64
    }

    /// The bus this ledger publishes to.
    pub fn bus(&self) -> &AuditBus {
        &self.bus
    }
}

/// Locks a provider's state, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
