//! The conflict registry.
//!
//! Routes conflicts to registered providers and keeps the global,
//! append-only resolution log. Global ids start at 1 and equal the log
//! position plus one, so they never repeat, even across provider removal
//! and re-registration.

use crate::error::{LedgerError, LedgerResult};
use crate::journal::JournalStore;
use reconcile_strategies::{AuditBus, Authority, Conflict, ResolutionProvider};
use reconcile_types::{AuditEvent, Digest, EventSource, Identity, ResolutionRecord, VersionInfo};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A registered provider together with the handle id minted for it.
#[derive(Clone)]
pub struct ProviderHandle {
    id: Uuid,
    provider: Arc<dyn ResolutionProvider>,
}

impl ProviderHandle {
    fn new(provider: Arc<dyn ResolutionProvider>) -> Self {
        Self {
            id: Uuid::now_v7(),
            provider,
        }
    }

    /// Handle id, fresh for every registration or update.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn ResolutionProvider> {
        &self.provider
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("id", &self.id)
            .field("strategy", &self.provider.id())
            .finish()
    }
}

/// Aggregate counters over the global log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub total: u64,
    pub auto_resolved: u64,
    pub manual: u64,
}

struct RegistryState {
    providers: HashMap<String, ProviderHandle>,
    /// Global log; id `n` lives at index `n - 1`.
    log: Vec<ResolutionRecord>,
    entity_index: HashMap<Digest, Vec<u64>>,
    usage: HashMap<String, u64>,
    auto_count: u64,
    manual_count: u64,
    journal: Option<JournalStore>,
}

impl RegistryState {
    fn new(journal: Option<JournalStore>) -> Self {
        Self {
            providers: HashMap::new(),
            log: Vec::new(),
            entity_index: HashMap::new(),
            usage: HashMap::new(),
            auto_count: 0,
            manual_count: 0,
            journal,
        }
    }

    fn next_id(&self) -> u64 {
        self.log.len() as u64 + 1
    }

    fn append(&mut self, route: &str, record: ResolutionRecord) -> u64 {
        let id = self.next_id();
        self.entity_index.entry(record.entity_id).or_default().push(id);
        *self.usage.entry(route.to_string()).or_insert(0) += 1;
        if record.auto_resolved {
            self.auto_count += 1;
        } else {
            self.manual_count += 1;
        }
        self.log.push(record);
        id
    }
}

fn validate_handle(strategy_id: &str, provider: &dyn ResolutionProvider) -> LedgerResult<()> {
    if strategy_id.is_empty() {
        return Err(LedgerError::InvalidHandle("empty strategy id".into()));
    }
    if provider.id().is_empty() {
        return Err(LedgerError::InvalidHandle(format!(
            "provider for '{strategy_id}' reports an empty id"
        )));
    }
    Ok(())
}

/// Provider directory and global resolution log.
///
/// Every operation runs under one mutex, provider dispatch included, so
/// operations are totally ordered and none observes another half-applied.
/// Providers must not call back into the registry.
///
/// The owner lives in an [`Authority`] that built-in providers share, so
/// an ownership transfer also moves their administration.
pub struct ConflictRegistry {
    state: Mutex<RegistryState>,
    authority: Authority,
    bus: AuditBus,
}

impl ConflictRegistry {
    /// Creates an empty registry administered by `owner`.
    pub fn new(owner: Identity, bus: AuditBus) -> Self {
        Self {
            state: Mutex::new(RegistryState::new(None)),
            authority: Authority::new(owner),
            bus,
        }
    }

    /// Creates a registry backed by a journal, replaying what it holds.
    ///
    /// Provider registrations are not journaled; register providers again
    /// after opening.
    pub fn with_journal(owner: Identity, bus: AuditBus, journal: JournalStore) -> LedgerResult<Self> {
        let entries = journal.load_all()?;
        let mut state = RegistryState::new(None);

        for entry in entries {
            let expected = state.next_id();
            if entry.id != expected {
                return Err(LedgerError::Storage(format!(
                    "journal gap: expected resolution {expected}, found {}",
                    entry.id
                )));
            }
            state.append(&entry.route, entry.record);
        }

        info!(resolutions = state.log.len(), "replayed resolution journal");
        state.journal = Some(journal);

        Ok(Self {
            state: Mutex::new(state),
            authority: Authority::new(owner),
            bus,
        })
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require_owner(&self, caller: Identity) -> LedgerResult<()> {
        if !self.authority.is_admin(&caller) {
            warn!(%caller, "rejected administrative call from non-owner");
            return Err(LedgerError::Unauthorized { caller });
        }
        Ok(())
    }

    /// The owner cell; hand clones to providers that should be administered
    /// by whoever owns the registry.
    #[must_use]
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// The bus this registry publishes to.
    #[must_use]
    pub fn bus(&self) -> &AuditBus {
        &self.bus
    }

    /// Subscribes to audit events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.bus.subscribe()
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Registers a provider under `strategy_id`. Returns the new handle id.
    pub fn register_provider(
        &self,
        caller: Identity,
        strategy_id: &str,
        provider: Arc<dyn ResolutionProvider>,
    ) -> LedgerResult<Uuid> {
        let mut state = self.lock();
        self.require_owner(caller)?;
        validate_handle(strategy_id, provider.as_ref())?;
        if state.providers.contains_key(strategy_id) {
            return Err(LedgerError::AlreadyRegistered(strategy_id.to_string()));
        }

        let handle = ProviderHandle::new(provider);
        let handle_id = handle.id();
        state.providers.insert(strategy_id.to_string(), handle);
        drop(state);

        info!(strategy = strategy_id, %handle_id, "registered provider");
        self.bus.publish(AuditEvent::ProviderRegistered {
            strategy_id: strategy_id.to_string(),
            handle: handle_id,
        });
        Ok(handle_id)
    }

    /// Replaces the provider behind `strategy_id`. Past log entries are
    /// untouched. Returns the new handle id.
    pub fn update_provider(
        &self,
        caller: Identity,
        strategy_id: &str,
        provider: Arc<dyn ResolutionProvider>,
    ) -> LedgerResult<Uuid> {
        let mut state = self.lock();
        self.require_owner(caller)?;
        validate_handle(strategy_id, provider.as_ref())?;
        let Some(slot) = state.providers.get_mut(strategy_id) else {
            return Err(LedgerError::NotRegistered(strategy_id.to_string()));
        };

        let handle = ProviderHandle::new(provider);
        let new_handle = handle.id();
        let old_handle = std::mem::replace(slot, handle).id();
        drop(state);

        info!(strategy = strategy_id, %old_handle, %new_handle, "updated provider");
        self.bus.publish(AuditEvent::ProviderUpdated {
            strategy_id: strategy_id.to_string(),
            old_handle,
            new_handle,
        });
        Ok(new_handle)
    }

    /// Removes the provider behind `strategy_id`. Its usage count and log
    /// entries remain.
    pub fn remove_provider(&self, caller: Identity, strategy_id: &str) -> LedgerResult<()> {
        let mut state = self.lock();
        self.require_owner(caller)?;
        if state.providers.remove(strategy_id).is_none() {
            return Err(LedgerError::NotRegistered(strategy_id.to_string()));
        }
        drop(state);

        info!(strategy = strategy_id, "removed provider");
        self.bus.publish(AuditEvent::ProviderRemoved {
            strategy_id: strategy_id.to_string(),
        });
        Ok(())
    }

    /// Hands administration to `new_owner`.
    pub fn transfer_ownership(&self, caller: Identity, new_owner: Identity) -> LedgerResult<()> {
        let mut state = self.lock();
        self.require_owner(caller)?;
        if new_owner.is_nil() {
            return Err(LedgerError::InvalidOwner);
        }
        let previous = self.authority.replace(new_owner);
        drop(state);

        info!(%previous, %new_owner, "transferred registry ownership");
        self.bus.publish(AuditEvent::OwnershipTransferred { previous, new_owner });
        Ok(())
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolves a conflict with the provider registered under `strategy_id`
    /// and appends a copy of its record to the global log.
    ///
    /// The provider validates and builds the record first, the journal
    /// stores it next, and only then does the provider commit. Returns the
    /// global resolution id. On error neither the registry nor the
    /// provider changes.
    pub fn resolve_with(&self, caller: Identity, strategy_id: &str, conflict: &Conflict) -> LedgerResult<u64> {
        let mut state = self.lock();
        let Some(handle) = state.providers.get(strategy_id) else {
            warn!(strategy = strategy_id, "resolve requested for unknown provider");
            return Err(LedgerError::UnknownProvider(strategy_id.to_string()));
        };
        let provider = Arc::clone(handle.provider());

        let prepared = provider.prepare(caller, conflict).map_err(|e| {
            warn!(strategy = strategy_id, entity = %conflict.entity_id, error = %e, "provider rejected conflict");
            e
        })?;
        let record = prepared.record().clone();

        let global_id = state.next_id();
        if let Some(journal) = &state.journal {
            journal.append(global_id, strategy_id, &record).map_err(|e| {
                warn!(strategy = strategy_id, resolution = global_id, error = %e, "journal append failed");
                e
            })?;
        }

        let local_id = provider.commit(prepared);
        let entity_id = record.entity_id;
        let winner = record.winner;
        let auto_resolved = record.auto_resolved;
        let resolved_at = record.resolved_at;
        let id = state.append(strategy_id, record);
        drop(state);

        info!(
            resolution = id,
            local = local_id,
            strategy = strategy_id,
            entity = %entity_id,
            %winner,
            auto_resolved,
            "recorded resolution"
        );
        self.bus.publish(AuditEvent::ConflictResolved {
            source: EventSource::Registry,
            resolution_id: id,
            entity_id,
            strategy: strategy_id.to_string(),
            winner,
            auto_resolved,
            resolved_at,
        });
        Ok(id)
    }

    /// Asks the provider whether it could decide without a human.
    /// Unknown strategies answer `false`.
    pub fn can_auto_resolve(
        &self,
        strategy_id: &str,
        version_a: &VersionInfo,
        version_b: &VersionInfo,
        ancestor_hash: &Digest,
    ) -> bool {
        let state = self.lock();
        match state.providers.get(strategy_id) {
            Some(handle) => handle.provider().can_auto_resolve(version_a, version_b, ancestor_hash),
            None => {
                debug!(strategy = strategy_id, "can_auto_resolve on unknown provider");
                false
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The record stored under a global id, or `None` if never issued.
    pub fn get_resolution(&self, resolution_id: u64) -> Option<ResolutionRecord> {
        let index = usize::try_from(resolution_id.checked_sub(1)?).ok()?;
        self.lock().log.get(index).cloned()
    }

    /// Global ids recorded for an entity, oldest first.
    pub fn get_entity_resolutions(&self, entity_id: &Digest) -> Vec<u64> {
        self.lock().entity_index.get(entity_id).cloned().unwrap_or_default()
    }

    /// Full records for an entity, oldest first.
    pub fn entity_history(&self, entity_id: &Digest) -> Vec<(u64, ResolutionRecord)> {
        let state = self.lock();
        let Some(ids) = state.entity_index.get(entity_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|&id| state.log.get((id - 1) as usize).map(|r| (id, r.clone())))
            .collect()
    }

    pub fn get_resolution_stats(&self) -> ResolutionStats {
        let state = self.lock();
        ResolutionStats {
            total: state.log.len() as u64,
            auto_resolved: state.auto_count,
            manual: state.manual_count,
        }
    }

    /// Resolutions routed through `strategy_id`, including ones recorded
    /// before the provider was removed or replaced.
    pub fn strategy_usage(&self, strategy_id: &str) -> u64 {
        self.lock().usage.get(strategy_id).copied().unwrap_or(0)
    }

    /// Length of the global log.
    pub fn resolution_count(&self) -> u64 {
        self.lock().log.len() as u64
    }

    pub fn owner(&self) -> Identity {
        self.authority.current()
    }

    pub fn provider(&self, strategy_id: &str) -> Option<ProviderHandle> {
        self.lock().providers.get(strategy_id).cloned()
    }

    /// Registered strategy ids, in no particular order.
    pub fn provider_ids(&self) -> Vec<String> {
        self.lock().providers.keys().cloned().collect()
    }
}
