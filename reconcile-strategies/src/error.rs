//! Error types for the strategy layer.

use reconcile_types::Identity;
use thiserror::Error;

/// Result type for strategy operations.
pub type StrategyResult<T> = Result<T, StrategyError>;

/// Errors a provider can raise. Every one of them is raised before the
/// provider writes anything.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Caller lacks the administrator or reviewer role.
    #[error("unauthorized: {caller} is not {role}")]
    Unauthorized { caller: Identity, role: &'static str },

    /// Resolution or queue id out of range.
    #[error("invalid id: {0}")]
    InvalidId(u64),

    /// The strategy needs a non-empty `extra_data` payload.
    #[error("missing merge metadata for strategy '{strategy}'")]
    MissingMergeMetadata { strategy: String },

    /// The payload did not decode against the strategy's schema.
    #[error("malformed merge metadata for strategy '{strategy}': {source}")]
    MalformedMetadata {
        strategy: String,
        #[source]
        source: serde_json::Error,
    },

    /// CRDT type counts do not add up to the declared field total.
    #[error("inconsistent field counts: type counts sum to {sum}, total is {total}")]
    InconsistentFieldCounts { sum: u64, total: u64 },

    /// Queue entry was already decided.
    #[error("queue entry {0} already resolved")]
    AlreadyResolved(u64),

    /// Winner code outside A / B / CustomMerge.
    #[error("invalid winner code: {0}")]
    InvalidWinner(u8),
}
