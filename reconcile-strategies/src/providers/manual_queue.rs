//! Manual review queue.
//!
//! Never decides on its own. `resolve` records that the conflict went to
//! review (winner `Manual`, zero merged digest) and enqueues it. A
//! registered reviewer later submits the human decision, which is stored
//! on the queue entry only; the resolution record is never rewritten.
//!
//! Entry lifecycle: `Pending` → `Resolved`, exactly once. Entries are
//! never removed. Queue ids equal the provider's local resolution ids.

use crate::audit::AuditBus;
use crate::authority::Authority;
use crate::conflict::{Conflict, ResolutionProvider};
use crate::error::{StrategyError, StrategyResult};
use crate::ledger::{lock, PreparedResolution, ProviderLedger, RecordDraft, Staged};
use crate::payload::ReviewHint;
use reconcile_types::{AuditEvent, Digest, Identity, ResolutionRecord, Timestamp, VersionInfo, Winner};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Mutex;
use tracing::{info, warn};

/// Canonical strategy id.
pub const MANUAL_QUEUE: &str = "manual_queue";

/// A reviewer's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewDecision {
    /// Keep version A.
    A,
    /// Keep version B.
    B,
    /// The reviewer produced a merge by hand.
    CustomMerge,
}

impl ReviewDecision {
    /// Maps wire codes 0, 1, 2 to `A`, `B`, `CustomMerge`.
    pub fn from_code(code: u8) -> StrategyResult<Self> {
        match code {
            0 => Ok(Self::A),
            1 => Ok(Self::B),
            2 => Ok(Self::CustomMerge),
            other => Err(StrategyError::InvalidWinner(other)),
        }
    }

    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::CustomMerge => 2,
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "a",
            Self::B => "b",
            Self::CustomMerge => "custom_merge",
        })
    }
}

/// Review state of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Pending,
    Resolved {
        resolved_at: Timestamp,
        resolved_by: Identity,
        decision: ReviewDecision,
        resolution_hash: Digest,
    },
}

/// A conflict awaiting (or having received) human review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub entity_id: Digest,
    pub version_a_hash: Digest,
    pub version_b_hash: Digest,
    pub ancestor_hash: Digest,
    /// Caller-supplied triage hint; higher is more urgent.
    pub priority: i32,
    pub enqueued_at: Timestamp,
    pub enqueued_by: Identity,
    pub conflicting_field_count: u32,
    pub status: QueueStatus,
}

impl QueueEntry {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.status, QueueStatus::Resolved { .. })
    }
}

#[derive(Debug)]
struct QueueState {
    ledger: ProviderLedger,
    entries: BTreeMap<u64, QueueEntry>,
    reviewers: HashSet<Identity>,
    pending: u64,
}

/// Queues conflicts for human review.
#[derive(Debug)]
pub struct ManualQueueProvider {
    authority: Authority,
    state: Mutex<QueueState>,
}

impl ManualQueueProvider {
    /// Creates the queue. `admin` maintains the reviewer set and is its
    /// first member.
    pub fn new(admin: Identity, bus: AuditBus) -> Self {
        Self::with_authority(Authority::new(admin), bus)
    }

    /// Creates the queue administered by whoever `authority` names at the
    /// time of each call. The administrator at construction is the first
    /// reviewer; later administrators add themselves explicitly.
    pub fn with_authority(authority: Authority, bus: AuditBus) -> Self {
        let first_reviewer = authority.current();
        Self {
            authority,
            state: Mutex::new(QueueState {
                ledger: ProviderLedger::new(MANUAL_QUEUE, bus),
                entries: BTreeMap::new(),
                reviewers: HashSet::from([first_reviewer]),
                pending: 0,
            }),
        }
    }

    pub fn admin(&self) -> Identity {
        self.authority.current()
    }

    /// Adds (`enabled`) or removes a reviewer. Administrator only.
    pub fn set_reviewer(&self, caller: Identity, reviewer: Identity, enabled: bool) -> StrategyResult<()> {
        self.authority.require(caller, "manual-queue administrator")?;
        let mut state = lock(&self.state);
        if enabled {
            state.reviewers.insert(reviewer);
        } else {
            state.reviewers.remove(&reviewer);
        }
        state.ledger.bus().publish(AuditEvent::ReviewerSet { reviewer, enabled });
        info!(reviewer = %reviewer, enabled, "reviewer updated");
        Ok(())
    }

    pub fn is_reviewer(&self, identity: &Identity) -> bool {
        lock(&self.state).reviewers.contains(identity)
    }

    /// Number of entries still awaiting review.
    pub fn pending_count(&self) -> u64 {
        lock(&self.state).pending
    }

    pub fn queue_entry(&self, queue_id: u64) -> Option<QueueEntry> {
        lock(&self.state).entries.get(&queue_id).cloned()
    }

    /// Unresolved entries, most urgent first: priority descending, then
    /// enqueue time, then queue id.
    pub fn pending_entries(&self) -> Vec<(u64, QueueEntry)> {
        let state = lock(&self.state);
        let mut pending: Vec<(u64, QueueEntry)> = state
            .entries
            .iter()
            .filter(|(_, e)| !e.is_resolved())
            .map(|(id, e)| (*id, e.clone()))
            .collect();
        pending.sort_by(|(id_a, a), (id_b, b)| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.enqueued_at.cmp(&b.enqueued_at))
                .then_with(|| id_a.cmp(id_b))
        });
        pending
    }

    /// Records the human decision for a queued conflict.
    pub fn submit_resolution(
        &self,
        caller: Identity,
        queue_id: u64,
        decision: ReviewDecision,
        resolution_hash: Digest,
    ) -> StrategyResult<()> {
        self.apply_review(caller, queue_id, Ok(decision), resolution_hash)
    }

    /// Like [`submit_resolution`](Self::submit_resolution), taking the
    /// decision as a wire code. Authorization and queue state are checked
    /// before the code.
    pub fn submit_resolution_code(
        &self,
        caller: Identity,
        queue_id: u64,
        code: u8,
        resolution_hash: Digest,
    ) -> StrategyResult<()> {
        self.apply_review(caller, queue_id, ReviewDecision::from_code(code), resolution_hash)
    }

    fn apply_review(
        &self,
        caller: Identity,
        queue_id: u64,
        decision: StrategyResult<ReviewDecision>,
        resolution_hash: Digest,
    ) -> StrategyResult<()> {
        let mut state = lock(&self.state);
        if !state.reviewers.contains(&caller) {
            warn!(caller = %caller, queue_id, "review rejected: not a reviewer");
            return Err(StrategyError::Unauthorized {
                caller,
                role: "reviewer",
            });
        }
        let entry = state
            .entries
            .get(&queue_id)
            .ok_or(StrategyError::InvalidId(queue_id))?;
        if entry.is_resolved() {
            return Err(StrategyError::AlreadyResolved(queue_id));
        }
        let decision = decision?;
        let entity_id = entry.entity_id;

        if let Some(entry) = state.entries.get_mut(&queue_id) {
            entry.status = QueueStatus::Resolved {
                resolved_at: Timestamp::now(),
                resolved_by: caller,
                decision,
                resolution_hash,
            };
        }
        state.pending -= 1;
        state.ledger.bus().publish(AuditEvent::ReviewSubmitted {
            queue_id,
            entity_id,
            reviewer: caller,
            decision: decision.to_string(),
            resolution_hash,
        });
        info!(queue_id, entity = %entity_id, decision = %decision, "manual review submitted");
        Ok(())
    }
}

impl ResolutionProvider for ManualQueueProvider {
    fn id(&self) -> &str {
        MANUAL_QUEUE
    }

    fn display_name(&self) -> &str {
        "Manual Queue (Human Review)"
    }

    fn prepare(&self, caller: Identity, conflict: &Conflict) -> StrategyResult<PreparedResolution> {
        let hint = ReviewHint::decode_lenient(&conflict.extra_data);

        let state = lock(&self.state);
        let depth = state.pending + 1;
        let ancestor_note = if conflict.has_ancestor() {
            "Ancestor available."
        } else {
            "No common ancestor available."
        };
        let details = format!(
            "Conflict queued for manual review. {} conflicting field(s). Priority: {}. Queue depth: {}. \
             Version A from replica {} at timestamp {}. Version B from replica {} at timestamp {}. {}",
            hint.conflicting_field_count,
            hint.priority,
            depth,
            conflict.version_a.replica_id,
            conflict.version_a.timestamp,
            conflict.version_b.replica_id,
            conflict.version_b.timestamp,
            ancestor_note,
        );

        let record = state.ledger.draft(
            caller,
            conflict,
            RecordDraft {
                winner: Winner::Manual,
                merged_hash: Digest::ZERO,
                auto_resolved: false,
                details,
            },
        );
        Ok(PreparedResolution::staged(record, Staged::Review(hint)))
    }

    fn commit(&self, prepared: PreparedResolution) -> u64 {
        let (record, staged) = prepared.into_parts();
        let hint = match staged {
            Staged::Review(hint) => hint,
            _ => ReviewHint::default(),
        };
        let entry = QueueEntry {
            entity_id: record.entity_id,
            version_a_hash: record.version_a_hash,
            version_b_hash: record.version_b_hash,
            ancestor_hash: record.ancestor_hash,
            priority: hint.priority,
            enqueued_at: record.resolved_at,
            enqueued_by: record.resolved_by,
            conflicting_field_count: hint.conflicting_field_count,
            status: QueueStatus::Pending,
        };

        let mut state = lock(&self.state);
        let id = state.ledger.commit(record);
        state.pending += 1;
        info!(
            queue_id = id,
            entity = %entry.entity_id,
            priority = entry.priority,
            depth = state.pending,
            "conflict queued for review"
        );
        state.entries.insert(id, entry);
        id
    }

    fn can_auto_resolve(&self, _a: &VersionInfo, _b: &VersionInfo, _ancestor: &Digest) -> bool {
        false
    }

    fn get_resolution(&self, resolution_id: u64) -> Option<ResolutionRecord> {
        lock(&self.state).ledger.get(resolution_id)
    }

    fn resolution_count(&self) -> u64 {
        lock(&self.state).ledger.count()
    }
}
