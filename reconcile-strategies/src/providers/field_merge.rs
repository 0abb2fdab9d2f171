//! Per-field merge accounting.
//!
//! The caller compares versions field by field: fields changed by only one
//! side are merged automatically, fields changed by both sides are true
//! conflicts, settled by a configured field preference where one exists.
//! This provider records the resulting counts and the merged digest.
//!
//! Preferences are kept here so every caller consults the same table before
//! producing its summary. They are keyed by [`field_key`] of the field name.

use crate::audit::AuditBus;
use crate::authority::Authority;
use crate::conflict::{Conflict, ResolutionProvider, Side};
use crate::error::StrategyResult;
use crate::ledger::{lock, PreparedResolution, ProviderLedger, RecordDraft, Staged};
use crate::payload::{decode_required, FieldMergeSummary};
use reconcile_types::{AuditEvent, Digest, Identity, ResolutionRecord, VersionInfo, Winner};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// Canonical strategy id.
pub const FIELD_MERGE: &str = "field_merge";

/// Preference-table key for a field name.
#[must_use]
pub fn field_key(name: &str) -> Digest {
    Digest::of(name.as_bytes())
}

#[derive(Debug)]
struct FieldMergeState {
    ledger: ProviderLedger,
    metadata: HashMap<u64, FieldMergeSummary>,
    preferences: HashMap<Digest, Side>,
}

/// Records field-level merges.
#[derive(Debug)]
pub struct FieldMergeProvider {
    authority: Authority,
    state: Mutex<FieldMergeState>,
}

impl FieldMergeProvider {
    /// Creates the provider; `admin` maintains the preference table.
    pub fn new(admin: Identity, bus: AuditBus) -> Self {
        Self::with_authority(Authority::new(admin), bus)
    }

    /// Creates the provider administered by whoever `authority` names at
    /// the time of each call.
    pub fn with_authority(authority: Authority, bus: AuditBus) -> Self {
        Self {
            authority,
            state: Mutex::new(FieldMergeState {
                ledger: ProviderLedger::new(FIELD_MERGE, bus),
                metadata: HashMap::new(),
                preferences: HashMap::new(),
            }),
        }
    }

    pub fn admin(&self) -> Identity {
        self.authority.current()
    }

    fn ensure_admin(&self, caller: Identity) -> StrategyResult<()> {
        self.authority.require(caller, "field-merge administrator")
    }

    /// Sets the preferred side for a field.
    pub fn set_field_preference(&self, caller: Identity, field_hash: Digest, side: Side) -> StrategyResult<()> {
        self.ensure_admin(caller)?;
        let mut state = lock(&self.state);
        state.preferences.insert(field_hash, side);
        state.ledger.bus().publish(AuditEvent::FieldPreferenceSet {
            field_hash,
            prefer_a: Some(side == Side::A),
        });
        info!(field = %field_hash, side = ?side, "field preference set");
        Ok(())
    }

    /// Removes a field preference. Clearing an unset field is a no-op.
    pub fn clear_field_preference(&self, caller: Identity, field_hash: Digest) -> StrategyResult<()> {
        self.ensure_admin(caller)?;
        let mut state = lock(&self.state);
        if state.preferences.remove(&field_hash).is_some() {
            state.ledger.bus().publish(AuditEvent::FieldPreferenceSet {
                field_hash,
                prefer_a: None,
            });
        }
        Ok(())
    }

    /// The preferred side for a field, if configured.
    pub fn field_preference(&self, field_hash: &Digest) -> Option<Side> {
        lock(&self.state).preferences.get(field_hash).copied()
    }

    /// The summary recorded with a local resolution.
    pub fn metadata(&self, resolution_id: u64) -> Option<FieldMergeSummary> {
        lock(&self.state).metadata.get(&resolution_id).copied()
    }
}

fn describe(summary: &FieldMergeSummary) -> String {
    let mut details = format!(
        "Field-level merge across {} fields. Auto-merged: {} from A, {} from B. Unchanged: {}.",
        summary.total_fields, summary.auto_merged_from_a, summary.auto_merged_from_b, summary.unchanged_fields
    );
    if summary.resolved_by_preference > 0 {
        details.push_str(&format!(
            " Resolved {} conflict(s) via field preference.",
            summary.resolved_by_preference
        ));
    }
    let unresolved = summary.unresolved_conflicts();
    if unresolved > 0 {
        details.push_str(&format!(
            " {unresolved} true conflict(s) without preference; manual review recommended."
        ));
    }
    details
}

impl ResolutionProvider for FieldMergeProvider {
    fn id(&self) -> &str {
        FIELD_MERGE
    }

    fn display_name(&self) -> &str {
        "Per-Field Merge"
    }

    fn prepare(&self, caller: Identity, conflict: &Conflict) -> StrategyResult<PreparedResolution> {
        let summary: FieldMergeSummary = decode_required(FIELD_MERGE, &conflict.extra_data)?;
        let auto_resolved = summary.true_conflict_count == summary.resolved_by_preference;

        let record = lock(&self.state).ledger.draft(
            caller,
            conflict,
            RecordDraft {
                winner: Winner::Merged,
                merged_hash: summary.merged_content_hash,
                auto_resolved,
                details: describe(&summary),
            },
        );
        Ok(PreparedResolution::staged(record, Staged::FieldMerge(summary)))
    }

    fn commit(&self, prepared: PreparedResolution) -> u64 {
        let (record, staged) = prepared.into_parts();
        let entity = record.entity_id;
        let auto_resolved = record.auto_resolved;

        let mut state = lock(&self.state);
        let id = state.ledger.commit(record);
        if let Staged::FieldMerge(summary) = staged {
            state.metadata.insert(id, summary);
            info!(
                resolution_id = id,
                entity = %entity,
                conflicts = summary.true_conflict_count,
                auto_resolved,
                "field merge recorded"
            );
        }
        id
    }

    /// True only when an ancestor is known; the field comparison needs a base.
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
