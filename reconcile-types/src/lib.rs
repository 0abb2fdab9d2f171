//! Core type definitions for the reconcile conflict ledger.
//!
//! This crate defines the shapes shared by every resolution strategy and
//! by the registry that records their output:
//! - 256-bit content digests ([`Digest`])
//! - Caller and replica identities (UUID v7)
//! - Wall-clock timestamps in seconds
//! - Vector clocks, of which only the digest crosses into the ledger
//! - [`VersionInfo`] / [`ResolutionRecord`], the unit of the audit log
//! - [`AuditEvent`], the notifications emitted by registry and providers
//!
//! Entity bodies never pass through here; only digests of them do.

mod digest;
mod event;
mod ids;
mod record;
mod timestamp;
mod vector_clock;

pub use digest::Digest;
pub use event::{AuditEvent, EventSource};
pub use ids::{Identity, ReplicaId};
pub use record::{ResolutionRecord, VersionInfo, Winner};
pub use timestamp::Timestamp;
pub use vector_clock::{CausalOrder, VectorClock};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),
}
