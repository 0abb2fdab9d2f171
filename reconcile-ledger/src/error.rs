//! Error types for the registry layer.

use reconcile_strategies::StrategyError;
use reconcile_types::Identity;
use thiserror::Error;

/// Result type for registry operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur in registry operations. A failed call leaves the
/// log, indices and counters unchanged.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No provider is registered under this strategy id.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("provider already registered: {0}")]
    AlreadyRegistered(String),

    #[error("provider not registered: {0}")]
    NotRegistered(String),

    /// Empty strategy id, or a provider reporting an empty id of its own.
    #[error("invalid provider handle: {0}")]
    InvalidHandle(String),

    /// The zero identity cannot own the registry.
    #[error("invalid owner")]
    InvalidOwner,

    #[error("unauthorized: {caller} is not the registry owner")]
    Unauthorized { caller: Identity },

    /// Journal error.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Rejected by the strategy.
    #[error(transparent)]
    Strategy(#[from] StrategyError),
}
