//! Pluggable conflict-resolution strategies.
//!
//! Every strategy implements [`ResolutionProvider`], the contract the
//! registry dispatches through:
//!
//! - [`LwwTimestampProvider`]: last-write-wins with deterministic tie-breaks
//! - [`FieldMergeProvider`]: records field-level merge accounting
//! - [`ThreeWayMergeProvider`]: records three-way diff classification
//! - [`CrdtMergeProvider`]: CRDT bookkeeping with convergence verification
//! - [`ManualQueueProvider`]: human-review queue with its own state machine
//!
//! # Architecture
//!
//! Providers never compute merges. The caller has already diffed or merged
//! the two versions and passes a summary in the conflict's `extra_data`;
//! each provider decodes it against its own schema (see [`payload`]) and
//! validates it in `prepare`, which returns a [`PreparedResolution`]
//! without writing anything. `commit` then stores the record through the
//! provider's [`ProviderLedger`] and cannot fail, so a caller may persist
//! the prepared record in between.
//!
//! Each provider owns its local record table and counters behind a single
//! mutex. Local resolution ids start at 1 and are independent of the
//! registry's global ids.
//!
//! # Example
//!
//! ```
//! use reconcile_strategies::{AuditBus, Conflict, LwwTimestampProvider, ResolutionProvider};
//! use reconcile_types::{Digest, Identity, ReplicaId, Timestamp, VersionInfo, Winner};
//!
//! let provider = LwwTimestampProvider::new(AuditBus::default());
//! let a = VersionInfo::new(Digest::of("a"), Timestamp::from_secs(100), Digest::of("vc-a"), ReplicaId::new());
//! let b = VersionInfo::new(Digest::of("b"), Timestamp::from_secs(50), Digest::of("vc-b"), ReplicaId::new());
//!
//! let id = provider.resolve(Identity::new(), &Conflict::new(Digest::of("note-1"), a, b)).unwrap();
//! assert_eq!(provider.get_resolution(id).unwrap().winner, Winner::A);
//! ```

mod audit;
mod authority;
mod conflict;
mod error;
mod ledger;
pub mod payload;
pub mod providers;

pub use audit::AuditBus;
pub use authority::Authority;
pub use conflict::{suggest_strategy, Conflict, ResolutionProvider, Side};
pub use error::{StrategyError, StrategyResult};
pub use ledger::{PreparedResolution, ProviderLedger, RecordDraft};
pub use payload::{CrdtMergeSummary, FieldMergeSummary, MergePayload, ReviewHint, ThreeWaySummary};
pub use providers::crdt_merge::{CrdtKind, CrdtMergeProvider, CRDT_MERGE};
pub use providers::field_merge::{field_key, FieldMergeProvider, FIELD_MERGE};
pub use providers::lww::{LwwStats, LwwTimestampProvider, LWW_TIMESTAMP};
pub use providers::manual_queue::{
    ManualQueueProvider, QueueEntry, QueueStatus, ReviewDecision, MANUAL_QUEUE,
};
pub use providers::three_way::{ThreeWayMergeProvider, ThreeWayStats, THREE_WAY_MERGE};

/// Canonical ids of the built-in strategies.
pub const BUILTIN_STRATEGIES: [&str; 5] = [
    LWW_TIMESTAMP,
    FIELD_MERGE,
    THREE_WAY_MERGE,
    CRDT_MERGE,
    MANUAL_QUEUE,
];
