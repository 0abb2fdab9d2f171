use proptest::prelude::*;
use reconcile_strategies::{AuditBus, Conflict, LwwStats, LwwTimestampProvider, ResolutionProvider, Side};
use reconcile_types::{AuditEvent, Digest, EventSource, Identity, ReplicaId, Timestamp, VersionInfo, Winner};

fn digest_starting_with(first: u8) -> Digest {
    let mut bytes = [0u8; 32];
    bytes[0] = first;
    Digest::from_bytes(bytes)
}

fn version(content: &str, ts: u64, clock: Digest) -> VersionInfo {
    VersionInfo::new(Digest::of(content), Timestamp::from_secs(ts), clock, ReplicaId::new())
}

fn conflict(a: VersionInfo, b: VersionInfo) -> Conflict {
    Conflict::new(Digest::of("entity"), a, b)
}

// ── Ordering ─────────────────────────────────────────────────────

#[test]
fn newer_timestamp_wins_a() {
    let provider = LwwTimestampProvider::new(AuditBus::default());
    let a = version("a", 100, digest_starting_with(0x01));
    let b = version("b", 50, digest_starting_with(0xFF));

    let id = provider.resolve(Identity::new(), &conflict(a, b)).unwrap();
    let record = provider.get_resolution(id).unwrap();

    assert_eq!(record.winner, Winner::A);
    assert_eq!(record.merged_hash, a.content_hash);
    assert!(record.auto_resolved);
    assert!(record.details.contains("delta A-B: 50s"));
    assert_eq!(provider.stats(), LwwStats { a_wins: 1, b_wins: 0, tie_breaks: 0 });
}

#[test]
fn newer_timestamp_wins_b() {
    let provider = LwwTimestampProvider::new(AuditBus::default());
    let a = version("a", 10, Digest::of("vc"));
    let b = version("b", 20, Digest::of("vc"));

    let id = provider.resolve(Identity::new(), &conflict(a, b)).unwrap();
    let record = provider.get_resolution(id).unwrap();

    assert_eq!(record.winner, Winner::B);
    assert_eq!(record.merged_hash, b.content_hash);
    assert!(record.details.contains("delta A-B: -10s"));
    assert_eq!(provider.stats().b_wins, 1);
}

// ── Tie-breaks ───────────────────────────────────────────────────

#[test]
fn equal_timestamps_larger_clock_digest_wins() {
    let provider = LwwTimestampProvider::new(AuditBus::default());
    let a = version("a", 100, digest_starting_with(0xFF));
    let b = version("b", 100, digest_starting_with(0x01));

    let id = provider.resolve(Identity::new(), &conflict(a, b)).unwrap();
    assert_eq!(provider.get_resolution(id).unwrap().winner, Winner::A);
    assert_eq!(provider.stats().tie_breaks, 1);

    let id = provider.resolve(Identity::new(), &conflict(b, a)).unwrap();
    assert_eq!(provider.get_resolution(id).unwrap().winner, Winner::B);
    assert_eq!(provider.stats().tie_breaks, 2);
}

#[test]
fn full_tie_defaults_to_a() {
    let provider = LwwTimestampProvider::new(AuditBus::default());
    let clock = Digest::of("same-clock");
    let a = version("a", 7, clock);
    let b = version("b", 7, clock);

    let id = provider.resolve(Identity::new(), &conflict(a, b)).unwrap();
    let record = provider.get_resolution(id).unwrap();
    assert_eq!(record.winner, Winner::A);
    assert_eq!(record.merged_hash, a.content_hash);
    assert_eq!(provider.stats(), LwwStats { a_wins: 1, b_wins: 0, tie_breaks: 1 });
}

#[test]
fn full_tie_uses_configured_side() {
    let provider = LwwTimestampProvider::with_tie_breaker(AuditBus::default(), Side::B);
    assert_eq!(provider.tie_breaker(), Side::B);
    let clock = Digest::of("same-clock");
    let a = version("a", 7, clock);
    let b = version("b", 7, clock);

    let id = provider.resolve(Identity::new(), &conflict(a, b)).unwrap();
    let record = provider.get_resolution(id).unwrap();
    assert_eq!(record.winner, Winner::B);
    assert_eq!(record.merged_hash, b.content_hash);
    assert!(record.details.contains("tie-breaker \"b\""));
    assert_eq!(provider.stats(), LwwStats { a_wins: 0, b_wins: 1, tie_breaks: 1 });

    // The configured side only settles full ties.
    let id = provider
        .resolve(Identity::new(), &conflict(version("a", 8, clock), version("b", 7, clock)))
        .unwrap();
    assert_eq!(provider.get_resolution(id).unwrap().winner, Winner::A);
}

// ── Two-phase resolution ─────────────────────────────────────────

#[test]
fn prepare_writes_nothing_until_commit() {
    let bus = AuditBus::default();
    let mut rx = bus.subscribe();
    let provider = LwwTimestampProvider::new(bus);
    let c = conflict(version("a", 2, Digest::ZERO), version("b", 1, Digest::ZERO));

    let prepared = provider.prepare(Identity::new(), &c).unwrap();
    assert_eq!(prepared.record().winner, Winner::A);
    assert_eq!(provider.resolution_count(), 0);
    assert_eq!(provider.stats(), LwwStats::default());
    assert!(rx.try_recv().is_err());

    let expected = prepared.record().clone();
    let id = provider.commit(prepared);
    assert_eq!(id, 1);
    assert_eq!(provider.get_resolution(id).unwrap(), expected);
    assert_eq!(provider.stats().a_wins, 1);
    assert!(rx.try_recv().is_ok());
}

// ── Record shape ─────────────────────────────────────────────────

#[test]
fn record_carries_caller_and_inputs() {
    let provider = LwwTimestampProvider::new(AuditBus::default());
    let caller = Identity::new();
    let ancestor = Digest::of("base");
    let a = version("a", 2, Digest::of("x"));
    let b = version("b", 1, Digest::of("y"));
    let c = conflict(a, b).with_ancestor(ancestor);

    let id = provider.resolve(caller, &c).unwrap();
    assert_eq!(id, 1);
    let record = provider.get_resolution(id).unwrap();
    assert_eq!(record.strategy, "lww_timestamp");
    assert_eq!(record.resolved_by, caller);
    assert_eq!(record.entity_id, c.entity_id);
    assert_eq!(record.version_a_hash, a.content_hash);
    assert_eq!(record.version_b_hash, b.content_hash);
    assert_eq!(record.ancestor_hash, ancestor);
}

#[test]
fn local_ids_increase() {
    let provider = LwwTimestampProvider::new(AuditBus::default());
    let c = conflict(version("a", 1, Digest::ZERO), version("b", 2, Digest::ZERO));
    assert_eq!(provider.resolve(Identity::new(), &c).unwrap(), 1);
    assert_eq!(provider.resolve(Identity::new(), &c).unwrap(), 2);
    assert_eq!(provider.resolution_count(), 2);
}

#[test]
fn unknown_id_is_none() {
    let provider = LwwTimestampProvider::new(AuditBus::default());
    assert!(provider.get_resolution(0).is_none());
    assert!(provider.get_resolution(1).is_none());
}

#[test]
fn emits_provider_event() {
    let bus = AuditBus::default();
    let mut rx = bus.subscribe();
    let provider = LwwTimestampProvider::new(bus);
    let c = conflict(version("a", 5, Digest::ZERO), version("b", 1, Digest::ZERO));

    provider.resolve(Identity::new(), &c).unwrap();

    match rx.try_recv().unwrap() {
        AuditEvent::ConflictResolved { source, resolution_id, winner, auto_resolved, .. } => {
            assert_eq!(source, EventSource::Provider("lww_timestamp".to_string()));
            assert_eq!(resolution_id, 1);
            assert_eq!(winner, Winner::A);
            assert!(auto_resolved);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

// ── Properties ───────────────────────────────────────────────────

fn arb_version() -> impl Strategy<Value = VersionInfo> {
    (any::<[u8; 32]>(), 0u64..1_000, any::<[u8; 32]>()).prop_map(|(content, ts, clock)| {
        VersionInfo::new(
            Digest::from_bytes(content),
            Timestamp::from_secs(ts),
            Digest::from_bytes(clock),
            ReplicaId::new(),
        )
    })
}

proptest! {
    /// Every pair is auto-resolvable and yields A or B.
    #[test]
    fn lww_is_total(a in arb_version(), b in arb_version()) {
        let provider = LwwTimestampProvider::new(AuditBus::default());
        prop_assert!(provider.can_auto_resolve(&a, &b, &Digest::ZERO));

        let id = provider.resolve(Identity::new(), &conflict(a, b)).unwrap();
        let winner = provider.get_resolution(id).unwrap().winner;
        prop_assert!(winner == Winner::A || winner == Winner::B);
    }

    /// A strictly newer timestamp wins regardless of clock digests.
    #[test]
    fn newer_timestamp_always_wins(a in arb_version(), b in arb_version()) {
        prop_assume!(a.timestamp != b.timestamp);
        let provider = LwwTimestampProvider::new(AuditBus::default());
        let id = provider.resolve(Identity::new(), &conflict(a, b)).unwrap();
        let expected = if a.timestamp > b.timestamp { Winner::A } else { Winner::B };
        prop_assert_eq!(provider.get_resolution(id).unwrap().winner, expected);
        prop_assert_eq!(provider.stats().tie_breaks, 0);
    }

    /// Swapping sides swaps the winner unless the versions fully tie.
    #[test]
    fn decision_is_symmetric(a in arb_version(), b in arb_version()) {
        prop_assume!(a.timestamp != b.timestamp || a.vector_clock_hash != b.vector_clock_hash);
        let provider = LwwTimestampProvider::new(AuditBus::default());
        let first = provider.resolve(Identity::new(), &conflict(a, b)).unwrap();
        let second = provider.resolve(Identity::new(), &conflict(b, a)).unwrap();
        let w1 = provider.get_resolution(first).unwrap().winner;
        let w2 = provider.get_resolution(second).unwrap().winner;
        prop_assert_ne!(w1, w2);
    }
}
