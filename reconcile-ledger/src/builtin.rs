//! Built-in strategies and ledger bootstrap.

use crate::config::LedgerConfig;
use crate::error::LedgerResult;
use crate::journal::JournalStore;
use crate::registry::ConflictRegistry;
use reconcile_strategies::{
    AuditBus, CrdtMergeProvider, FieldMergeProvider, LwwTimestampProvider, ManualQueueProvider, ResolutionProvider,
    Side, ThreeWayMergeProvider, BUILTIN_STRATEGIES, CRDT_MERGE, FIELD_MERGE, LWW_TIMESTAMP, MANUAL_QUEUE,
    THREE_WAY_MERGE,
};
use reconcile_types::Identity;
use std::sync::Arc;
use tracing::info;

/// Concrete handles to the built-in providers, for the operations that
/// are not part of the provider trait (reviews, preferences, stats).
#[derive(Debug, Clone)]
pub struct BuiltinProviders {
    pub lww: Arc<LwwTimestampProvider>,
    pub field_merge: Arc<FieldMergeProvider>,
    pub three_way: Arc<ThreeWayMergeProvider>,
    pub crdt: Arc<CrdtMergeProvider>,
    pub manual_queue: Arc<ManualQueueProvider>,
}

impl BuiltinProviders {
    fn create(registry: &ConflictRegistry, tie_breaker: Side) -> Self {
        let bus = registry.bus().clone();
        let authority = registry.authority().clone();
        Self {
            lww: Arc::new(LwwTimestampProvider::with_tie_breaker(bus.clone(), tie_breaker)),
            field_merge: Arc::new(FieldMergeProvider::with_authority(authority.clone(), bus.clone())),
            three_way: Arc::new(ThreeWayMergeProvider::new(bus.clone())),
            crdt: Arc::new(CrdtMergeProvider::new(bus.clone())),
            manual_queue: Arc::new(ManualQueueProvider::with_authority(authority, bus)),
        }
    }

    /// The provider for a built-in strategy id.
    pub fn get(&self, strategy_id: &str) -> Option<Arc<dyn ResolutionProvider>> {
        let provider: Arc<dyn ResolutionProvider> = match strategy_id {
            LWW_TIMESTAMP => self.lww.clone(),
            FIELD_MERGE => self.field_merge.clone(),
            THREE_WAY_MERGE => self.three_way.clone(),
            CRDT_MERGE => self.crdt.clone(),
            MANUAL_QUEUE => self.manual_queue.clone(),
            _ => return None,
        };
        Some(provider)
    }
}

/// Registers the five built-in strategies under their canonical ids.
///
/// `admin` must be the registry owner. The field preference table and the
/// reviewer set are administered by whoever owns the registry, including
/// owners installed later by `transfer_ownership`.
pub fn install_builtin_providers(registry: &ConflictRegistry, admin: Identity) -> LedgerResult<BuiltinProviders> {
    install_with_tie_breaker(registry, admin, Side::A)
}

fn install_with_tie_breaker(
    registry: &ConflictRegistry,
    admin: Identity,
    tie_breaker: Side,
) -> LedgerResult<BuiltinProviders> {
    let builtins = BuiltinProviders::create(registry, tie_breaker);
    for strategy_id in BUILTIN_STRATEGIES {
        if let Some(provider) = builtins.get(strategy_id) {
            registry.register_provider(admin, strategy_id, provider)?;
        }
    }
    Ok(builtins)
}

/// A registry opened from configuration.
pub struct Ledger {
    pub registry: ConflictRegistry,
    /// Present when built-in strategies were enabled.
    pub builtins: Option<BuiltinProviders>,
}

/// Builds a registry owned by `owner` from `config`: sizes the audit bus,
/// replays the journal if one is configured, and installs the built-ins.
pub fn open_ledger(owner: Identity, config: &LedgerConfig) -> LedgerResult<Ledger> {
    let bus = AuditBus::new(config.event_capacity);
    let registry = match &config.journal_path {
        Some(path) => {
            info!("Opening resolution journal at {:?}", path);
            ConflictRegistry::with_journal(owner, bus, JournalStore::open(path)?)?
        }
        None => ConflictRegistry::new(owner, bus),
    };

    let builtins = if config.builtin_strategies {
        Some(install_with_tie_breaker(&registry, owner, config.tie_breaker)?)
    } else {
        None
    };

    Ok(Ledger { registry, builtins })
}
