//! The administrator identity shared by the registry and its providers.

use crate::error::{StrategyError, StrategyResult};
use reconcile_types::Identity;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

/// Current administrator. Clones share one cell, so a transfer made
/// through any clone is seen by all of them.
#[derive(Debug, Clone)]
pub struct Authority {
    admin: Arc<RwLock<Identity>>,
}

impl Authority {
    pub fn new(admin: Identity) -> Self {
        Self {
            admin: Arc::new(RwLock::new(admin)),
        }
    }

    #[must_use]
    pub fn current(&self) -> Identity {
        *self.admin.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_admin(&self, caller: &Identity) -> bool {
        self.current() == *caller
    }

    /// Installs a new administrator and returns the previous one.
    pub fn replace(&self, new_admin: Identity) -> Identity {
        let mut admin = self.admin.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *admin, new_admin)
    }

    pub(crate) fn require(&self, caller: Identity, role: &'static str) -> StrategyResult<()> {
        if !self.is_admin(&caller) {
            warn!(%caller, role, "rejected administrative call");
            return Err(StrategyError::Unauthorized { caller, role });
        }
        Ok(())
    }
}
