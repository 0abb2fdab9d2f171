//! Vector Clock for causality tracking.
//!
//! The full clock lives with the replicas; the ledger only ever sees its
//! digest. This type lets callers build, merge and digest clocks the same
//! way on every replica so that equal clocks always produce equal digests.

use crate::{Digest, ReplicaId};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::collections::BTreeMap;

/// Causality relationship between two vector clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalOrder {
    /// First clock happened before second.
    Before,
    /// First clock happened after second.
    After,
    /// Clocks are concurrent (neither happened before the other).
    Concurrent,
    /// Clocks are identical.
    Equal,
}

/// A Vector Clock keyed by replica.
///
/// Entries are kept sorted by replica so the digest is independent of
/// insertion order. Zero entries are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock {
    clocks: BTreeMap<ReplicaId, u64>,
}

impl VectorClock {
    /// Creates a new empty vector clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the logical time for a replica (0 if not present).
    #[must_use]
    pub fn get(&self, replica: &ReplicaId) -> u64 {
        self.clocks.get(replica).copied().unwrap_or(0)
    }

    /// Returns the number of replicas in the clock.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    /// Returns true if the clock has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    /// Increments the clock for a replica and returns the new time.
    pub fn increment(&mut self, replica: ReplicaId) -> u64 {
        let entry = self.clocks.entry(replica).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Raises a replica's entry to `time` if it is behind.
    pub fn update(&mut self, replica: ReplicaId, time: u64) {
        if time == 0 {
            return;
        }
        let entry = self.clocks.entry(replica).or_insert(0);
        if time > *entry {
            *entry = time;
        }
    }

    /// Merges another vector clock into this one (pointwise maximum).
    pub fn merge(&mut self, other: &Self) {
        for (replica, &time) in &other.clocks {
            self.update(*replica, time);
        }
    }

    /// Creates a new clock that is the merge of this and another.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.merge(other);
        result
    }

    /// Compares this clock with another to determine causal ordering.
    #[must_use]
    pub fn compare(&self, other: &Self) -> CausalOrder {
        let mut self_ge = true;
        let mut other_ge = true;

        for replica in self.clocks.keys().chain(other.clocks.keys()) {
            let mine = self.get(replica);
            let theirs = other.get(replica);
            if mine < theirs {
                self_ge = false;
            }
            if theirs < mine {
                other_ge = false;
            }
        }

        match (self_ge, other_ge) {
            (true, true) => CausalOrder::Equal,
            (true, false) => CausalOrder::After,
            (false, true) => CausalOrder::Before,
            (false, false) => CausalOrder::Concurrent,
        }
    }

    /// Returns true if this clock is concurrent with the other.
    #[must_use]
    pub fn is_concurrent(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Concurrent
    }

    /// SHA-256 over `(replica uuid bytes, big-endian counter)` pairs in
    /// replica order. The empty clock digests to the hash of no input.
    #[must_use]
    pub fn digest(&self) -> Digest {
        let mut hasher = Sha256::new();
        for (replica, time) in &self.clocks {
            hasher.update(replica.as_uuid().as_bytes());
            hasher.update(time.to_be_bytes());
        }
        Digest::from_bytes(hasher.finalize().into())
    }
}
