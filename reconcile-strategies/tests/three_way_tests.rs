use reconcile_strategies::{
    AuditBus, Conflict, MergePayload, ResolutionProvider, StrategyError, ThreeWayMergeProvider,
    ThreeWayStats, ThreeWaySummary,
};
use reconcile_types::{Digest, Identity, ReplicaId, Timestamp, VersionInfo, Winner};

fn version(content: &str) -> VersionInfo {
    VersionInfo::new(Digest::of(content), Timestamp::from_secs(3), Digest::of("vc"), ReplicaId::new())
}

fn summary(overlapping: u32) -> ThreeWaySummary {
    ThreeWaySummary {
        diff_a_count: 3,
        diff_b_count: 2,
        overlapping_changes: overlapping,
        clean_merges: 5 - 2 * overlapping,
        merged_content_hash: Digest::of("merged"),
    }
}

fn conflict(ancestor: Digest, payload: &ThreeWaySummary) -> Conflict {
    Conflict::new(Digest::of("page"), version("a"), version("b"))
        .with_ancestor(ancestor)
        .with_extra_data(payload.encode())
}

#[test]
fn clean_merge_is_auto() {
    let provider = ThreeWayMergeProvider::new(AuditBus::default());
    let id = provider.resolve(Identity::new(), &conflict(Digest::of("base"), &summary(0))).unwrap();
    let record = provider.get_resolution(id).unwrap();

    assert_eq!(record.winner, Winner::Merged);
    assert!(record.auto_resolved);
    assert_eq!(record.merged_hash, Digest::of("merged"));
    assert!(record.details.starts_with("Three-way merge against ancestor."));
}

#[test]
fn overlapping_change_is_not_auto() {
    let provider = ThreeWayMergeProvider::new(AuditBus::default());
    let id = provider.resolve(Identity::new(), &conflict(Digest::of("base"), &summary(1))).unwrap();
    let record = provider.get_resolution(id).unwrap();

    assert!(!record.auto_resolved);
    assert!(record.details.contains("Overlapping changes on 1 field(s)"));
}

#[test]
fn missing_ancestor_records_degraded_merge() {
    let provider = ThreeWayMergeProvider::new(AuditBus::default());
    let id = provider.resolve(Identity::new(), &conflict(Digest::ZERO, &summary(0))).unwrap();
    let record = provider.get_resolution(id).unwrap();

    assert_eq!(record.winner, Winner::Merged);
    assert!(record.auto_resolved);
    assert!(record.details.contains("degraded"));
    assert!(!record.has_ancestor());
    assert_eq!(provider.stats().degraded, 1);
}

#[test]
fn empty_payload_is_missing_metadata() {
    let provider = ThreeWayMergeProvider::new(AuditBus::default());
    let c = Conflict::new(Digest::of("page"), version("a"), version("b")).with_ancestor(Digest::of("base"));
    let err = provider.resolve(Identity::new(), &c).unwrap_err();
    assert!(matches!(err, StrategyError::MissingMergeMetadata { .. }));
    assert_eq!(provider.resolution_count(), 0);
    assert_eq!(provider.stats(), ThreeWayStats::default());
}

#[test]
fn can_auto_resolve_requires_ancestor() {
    let provider = ThreeWayMergeProvider::new(AuditBus::default());
    let (a, b) = (version("a"), version("b"));
    assert!(!provider.can_auto_resolve(&a, &b, &Digest::ZERO));
    assert!(provider.can_auto_resolve(&a, &b, &Digest::of("base")));
}

#[test]
fn stats_accumulate() {
    let provider = ThreeWayMergeProvider::new(AuditBus::default());
    provider.resolve(Identity::new(), &conflict(Digest::of("base"), &summary(0))).unwrap();
    provider.resolve(Identity::new(), &conflict(Digest::of("base"), &summary(2))).unwrap();

    assert_eq!(
        provider.stats(),
        ThreeWayStats { clean_merges: 5 + 1, overlapping_changes: 2, degraded: 0 }
    );
    assert_eq!(provider.metadata(2), Some(summary(2)));
}

#[test]
fn suggested_strategy_depends_on_ancestor() {
    assert_eq!(
        reconcile_strategies::suggest_strategy(&Digest::of("base")),
        reconcile_strategies::THREE_WAY_MERGE
    );
    assert_eq!(
        reconcile_strategies::suggest_strategy(&Digest::ZERO),
        reconcile_strategies::FIELD_MERGE
    );
}
