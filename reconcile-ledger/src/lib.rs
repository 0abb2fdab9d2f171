//! Conflict-resolution registry and append-only audit ledger.
//!
//! The [`ConflictRegistry`] routes bidirectional-sync conflicts to the
//! strategy registered under a given id, copies the record the strategy
//! produced into a global, append-only log, and indexes it by entity and
//! by strategy.
//!
//! # Architecture
//!
//! - **Registry**: provider directory, global log, per-entity history,
//!   usage counters, owner-gated administration. One mutex serializes
//!   every operation, provider dispatch included. A resolution is
//!   prepared by its provider, journaled, then committed, so a failure at
//!   any step leaves every table as it was.
//! - **Providers**: see `reconcile-strategies`. Each keeps its own local
//!   table; the registry only ever holds copies of their records.
//! - **Journal**: optional SQLite mirror of the global log, replayed on open.
//! - **Audit bus**: every change is published as an [`AuditEvent`].
//!
//! # Example
//!
//! ```
//! use reconcile_ledger::{install_builtin_providers, ConflictRegistry};
//! use reconcile_strategies::{AuditBus, Conflict, LWW_TIMESTAMP};
//! use reconcile_types::{Digest, Identity, ReplicaId, Timestamp, VersionInfo, Winner};
//!
//! let admin = Identity::new();
//! let registry = ConflictRegistry::new(admin, AuditBus::default());
//! install_builtin_providers(&registry, admin).unwrap();
//!
//! let a = VersionInfo::new(Digest::of("a"), Timestamp::from_secs(100), Digest::of("vc-a"), ReplicaId::new());
//! let b = VersionInfo::new(Digest::of("b"), Timestamp::from_secs(50), Digest::of("vc-b"), ReplicaId::new());
//! let id = registry
//!     .resolve_with(admin, LWW_TIMESTAMP, &Conflict::new(Digest::of("note-1"), a, b))
//!     .unwrap();
//!
//! assert_eq!(registry.get_resolution(id).unwrap().winner, Winner::A);
//! ```
//!
//! [`AuditEvent`]: reconcile_types::AuditEvent

mod builtin;
mod config;
mod error;
pub mod journal;
mod registry;

pub use builtin::{install_builtin_providers, open_ledger, BuiltinProviders, Ledger};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use journal::{JournalEntry, JournalStore};
pub use registry::{ConflictRegistry, ProviderHandle, ResolutionStats};
