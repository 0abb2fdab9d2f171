use pretty_assertions::assert_eq;
use reconcile_types::{
    AuditEvent, Digest, EventSource, Identity, ReplicaId, ResolutionRecord, Timestamp,
    VectorClock, VersionInfo, Winner,
};
use std::str::FromStr;

// ── Winner ────────────────────────────────────────────────────────

#[test]
fn winner_names_roundtrip() {
    for w in [Winner::A, Winner::B, Winner::Merged, Winner::Manual] {
        assert_eq!(Winner::from_str(w.as_str()).unwrap(), w);
    }
    assert!(Winner::from_str("c").is_err());
}

// ── VersionInfo ───────────────────────────────────────────────────

#[test]
fn from_clock_uses_clock_digest() {
    let replica = ReplicaId::new();
    let mut clock = VectorClock::new();
    clock.increment(replica);

    let v = VersionInfo::from_clock(Digest::of("body"), Timestamp::from_secs(10), &clock, replica);
    assert_eq!(v.vector_clock_hash, clock.digest());
    assert_eq!(v.replica_id, replica);
}

// ── ResolutionRecord ──────────────────────────────────────────────

#[test]
fn has_ancestor_tracks_zero_sentinel() {
    let mut record = ResolutionRecord {
        entity_id: Digest::of("entity"),
        strategy: "lww_timestamp".to_string(),
        winner: Winner::A,
        version_a_hash: Digest::of("a"),
        version_b_hash: Digest::of("b"),
        ancestor_hash: Digest::ZERO,
        merged_hash: Digest::of("a"),
        resolved_at: Timestamp::from_secs(1),
        resolved_by: Identity::new(),
        auto_resolved: true,
        details: String::new(),
        extra_data: Vec::new(),
    };
    assert!(!record.has_ancestor());
    record.ancestor_hash = Digest::of("base");
    assert!(record.has_ancestor());
}

// ── AuditEvent ────────────────────────────────────────────────────

#[test]
fn conflict_resolved_serializes_with_tag() {
    let event = AuditEvent::ConflictResolved {
        source: EventSource::Provider("crdt_merge".to_string()),
        resolution_id: 3,
        entity_id: Digest::of("e"),
        strategy: "crdt_merge".to_string(),
        winner: Winner::Merged,
        auto_resolved: true,
        resolved_at: Timestamp::from_secs(42),
    };
    assert_eq!(event.name(), "conflict_resolved");

    let json = event.to_json().unwrap();
    assert!(json.contains("\"event\":\"ConflictResolved\""));
    assert!(json.contains("\"winner\":\"merged\""));

    let back: AuditEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn event_source_display() {
    assert_eq!(EventSource::Registry.to_string(), "registry");
    assert_eq!(EventSource::Provider("x".into()).to_string(), "provider:x");
}
