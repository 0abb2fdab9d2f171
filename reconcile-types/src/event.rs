//! Audit events.
//!
//! Emitted by the registry for every administrative change and every
//! resolution it records, and by each provider for the resolutions and
//! reviews it records locally. Observers must treat them as at-least-once,
//! ordered per source; there is no transaction spanning registry and provider.

use crate::{Digest, Identity, Timestamp, Winner};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which component emitted an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum EventSource {
    /// The registry; resolution ids are global.
    Registry,
    /// A provider; resolution ids are local to that provider.
    Provider(String),
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry => f.write_str("registry"),
            Self::Provider(id) => write!(f, "provider:{id}"),
        }
    }
}

/// A notification about a change to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum AuditEvent {
    ProviderRegistered {
        strategy_id: String,
        handle: Uuid,
    },

    ProviderUpdated {
        strategy_id: String,
        old_handle: Uuid,
        new_handle: Uuid,
    },

    ProviderRemoved {
        strategy_id: String,
    },

    OwnershipTransferred {
        previous: Identity,
        new_owner: Identity,
    },

    ConflictResolved {
        source: EventSource,
        resolution_id: u64,
        entity_id: Digest,
        strategy: String,
        winner: Winner,
        auto_resolved: bool,
        resolved_at: Timestamp,
    },

    // ── Strategy administration ─────────────────────────────────

    /// A field-merge preference was set (`Some`) or cleared (`None`).
    FieldPreferenceSet {
        field_hash: Digest,
        prefer_a: Option<bool>,
    },

    ReviewerSet {
        reviewer: Identity,
        enabled: bool,
    },

    /// A queued conflict received its human decision.
    ReviewSubmitted {
        queue_id: u64,
        entity_id: Digest,
        reviewer: Identity,
        decision: String,
        resolution_hash: Digest,
    },
}

impl AuditEvent {
    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProviderRegistered { .. } => "provider_registered",
            Self::ProviderUpdated { .. } => "provider_updated",
            Self::ProviderRemoved { .. } => "provider_removed",
            Self::OwnershipTransferred { .. } => "ownership_transferred",
            Self::ConflictResolved { .. } => "conflict_resolved",
            Self::FieldPreferenceSet { .. } => "field_preference_set",
            Self::ReviewerSet { .. } => "reviewer_set",
            Self::ReviewSubmitted { .. } => "review_submitted",
        }
    }

    /// Serializes the event as JSON for external indexers.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
