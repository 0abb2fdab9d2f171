//! Last-Write-Wins by timestamp.
//!
//! Total: every conflict gets a winner, A or B, without human input.
//! The losing version is discarded entirely, which is the price of totality.
//!
//! Decision order:
//! 1. Larger wall-clock timestamp wins.
//! 2. Equal timestamps: the numerically larger vector-clock digest wins.
//! 3. Fully identical: the configured tie-break side wins (A by default).
//!
//! Cases 2 and 3 count as tie-breaks.

use crate::audit::AuditBus;
use crate::conflict::{Conflict, ResolutionProvider, Side};
use crate::error::StrategyResult;
use crate::ledger::{lock, PreparedResolution, ProviderLedger, RecordDraft, Staged};
use reconcile_types::{Digest, Identity, ResolutionRecord, VersionInfo, Winner};
use std::cmp::Ordering;
use std::sync::Mutex;
use tracing::{debug, info};

/// Canonical strategy id.
pub const LWW_TIMESTAMP: &str = "lww_timestamp";

/// Running decision counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LwwStats {
    pub a_wins: u64,
    pub b_wins: u64,
    pub tie_breaks: u64,
}

#[derive(Debug)]
struct LwwState {
    ledger: ProviderLedger,
    stats: LwwStats,
}

/// Resolves conflicts by picking the most recent version.
#[derive(Debug)]
pub struct LwwTimestampProvider {
    tie_breaker: Side,
    state: Mutex<LwwState>,
}

/// Outcome of the ordering rules, before anything is recorded.
struct Decision {
    winner: Winner,
    tie_break: bool,
    reason: String,
}

fn decide(a: &VersionInfo, b: &VersionInfo, tie_breaker: Side) -> Decision {
    if a.timestamp != b.timestamp {
        let winner = if a.timestamp > b.timestamp { Winner::A } else { Winner::B };
        return Decision {
            winner,
            tie_break: false,
            reason: format!(
                "LWW selected version {winner} (timestamp delta A-B: {}s).",
                a.timestamp.delta(&b.timestamp)
            ),
        };
    }

    match a.vector_clock_hash.cmp(&b.vector_clock_hash) {
        Ordering::Equal => Decision {
            winner: tie_breaker.winner(),
            tie_break: true,
            reason: format!(
                "Timestamps ({}) and vector clocks identical; used configured tie-breaker \"{tie_breaker}\".",
                a.timestamp
            ),
        },
        order => {
            let winner = if order == Ordering::Greater { Winner::A } else { Winner::B };
            Decision {
                winner,
                tie_break: true,
                reason: format!(
                    "Timestamps equal ({}); broke tie via vector clock digest, version {winner} is greater.",
                    a.timestamp
                ),
            }
        }
    }
}

impl LwwTimestampProvider {
    /// Creates a provider that settles full ties in favour of A.
    pub fn new(bus: AuditBus) -> Self {
        Self::with_tie_breaker(bus, Side::A)
    }

    /// Creates a provider that settles full ties in favour of `tie_breaker`.
    pub fn with_tie_breaker(bus: AuditBus, tie_breaker: Side) -> Self {
        Self {
            tie_breaker,
            state: Mutex::new(LwwState {
                ledger: ProviderLedger::new(LWW_TIMESTAMP, bus),
                stats: LwwStats::default(),
            }),
        }
    }

    pub fn tie_breaker(&self) -> Side {
        self.tie_breaker
    }

    /// Counters of A wins, B wins and tie-breaks so far.
    pub fn stats(&self) -> LwwStats {
        lock(&self.state).stats
    }
}

impl ResolutionProvider for LwwTimestampProvider {
    fn id(&self) -> &str {
        LWW_TIMESTAMP
    }

    fn display_name(&self) -> &str {
        "Last-Write-Wins (Timestamp)"
    }

    fn prepare(&self, caller: Identity, conflict: &Conflict) -> StrategyResult<PreparedResolution> {
        let a = &conflict.version_a;
        let b = &conflict.version_b;
        let decision = decide(a, b, self.tie_breaker);

        let (kept, lost) = match decision.winner {
            Winner::B => (b, a),
            _ => (a, b),
        };
        let details = format!(
            "{} Losing version from replica {} at timestamp {} was discarded.",
            decision.reason, lost.replica_id, lost.timestamp
        );

        let state = lock(&self.state);
        let record = state.ledger.draft(
            caller,
            conflict,
            RecordDraft {
                winner: decision.winner,
                merged_hash: kept.content_hash,
                auto_resolved: true,
                details,
            },
        );
        Ok(PreparedResolution::staged(
            record,
            Staged::Lww {
                tie_break: decision.tie_break,
            },
        ))
    }

    fn commit(&self, prepared: PreparedResolution) -> u64 {
        let (record, staged) = prepared.into_parts();
        let entity = record.entity_id;
        let winner = record.winner;

        let mut state = lock(&self.state);
        match winner {
            Winner::B => state.stats.b_wins += 1,
            _ => state.stats.a_wins += 1,
        }
        if let Staged::Lww { tie_break: true } = staged {
            state.stats.tie_breaks += 1;
            debug!(entity = %entity, winner = %winner, "LWW tie-break");
        }

        let id = state.ledger.commit(record);
        info!(resolution_id = id, entity = %entity, winner = %winner, "LWW resolution recorded");
        id
    }

    fn can_auto_resolve(&self, _a: &VersionInfo, _b: &VersionInfo, _ancestor: &Digest) -> bool {
        true
    }

    fn get_resolution(&self, resolution_id: u64) -> Option<ResolutionRecord> {
        lock(&self.state).ledger.get(resolution_id)
    }

    fn resolution_count(&self) -> u64 {
        lock(&self.state).ledger.count()
    }
}
