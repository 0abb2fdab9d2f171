use reconcile_strategies::{
    AuditBus, Authority, Conflict, ManualQueueProvider, MergePayload, QueueStatus, ResolutionProvider,
    ReviewDecision, ReviewHint, StrategyError,
};
use reconcile_types::{AuditEvent, Digest, Identity, ReplicaId, Timestamp, VersionInfo, Winner};

fn version(content: &str, ts: u64) -> VersionInfo {
    VersionInfo::new(Digest::of(content), Timestamp::from_secs(ts), Digest::of("vc"), ReplicaId::new())
}

fn conflict(entity: &str) -> Conflict {
    Conflict::new(Digest::of(entity), version("a", 1), version("b", 2))
}

fn hinted(entity: &str, priority: i32) -> Conflict {
    conflict(entity).with_extra_data(
        ReviewHint {
            priority,
            conflicting_field_count: 2,
        }
        .encode(),
    )
}

// ── resolve / enqueue ────────────────────────────────────────────

#[test]
fn resolve_enqueues_manual_record() {
    let queue = ManualQueueProvider::new(Identity::new(), AuditBus::default());
    let id = queue.resolve(Identity::new(), &hinted("task", 5)).unwrap();
    let record = queue.get_resolution(id).unwrap();

    assert_eq!(record.winner, Winner::Manual);
    assert!(!record.auto_resolved);
    assert!(record.merged_hash.is_zero());
    assert_eq!(queue.pending_count(), 1);

    let entry = queue.queue_entry(id).unwrap();
    assert_eq!(entry.priority, 5);
    assert_eq!(entry.conflicting_field_count, 2);
    assert_eq!(entry.status, QueueStatus::Pending);
}

#[test]
fn missing_or_short_hint_uses_defaults() {
    let queue = ManualQueueProvider::new(Identity::new(), AuditBus::default());
    let plain = queue.resolve(Identity::new(), &conflict("a")).unwrap();
    let short = queue
        .resolve(Identity::new(), &conflict("b").with_extra_data(vec![0x7b]))
        .unwrap();

    for id in [plain, short] {
        let entry = queue.queue_entry(id).unwrap();
        assert_eq!(entry.priority, 0);
        assert_eq!(entry.conflicting_field_count, 0);
    }
    assert_eq!(queue.pending_count(), 2);
}

#[test]
fn prepare_does_not_enqueue() {
    let queue = ManualQueueProvider::new(Identity::new(), AuditBus::default());
    let prepared = queue.prepare(Identity::new(), &hinted("task", 4)).unwrap();
    assert_eq!(prepared.record().winner, Winner::Manual);
    assert_eq!(queue.pending_count(), 0);
    assert_eq!(queue.resolution_count(), 0);
    assert!(queue.pending_entries().is_empty());

    let id = queue.commit(prepared);
    assert_eq!(queue.pending_count(), 1);
    assert_eq!(queue.queue_entry(id).unwrap().priority, 4);
}

#[test]
fn never_auto_resolvable() {
    let queue = ManualQueueProvider::new(Identity::new(), AuditBus::default());
    assert!(!queue.can_auto_resolve(&version("a", 1), &version("b", 1), &Digest::of("base")));
}

// ── Lifecycle ────────────────────────────────────────────────────

#[test]
fn review_lifecycle() {
    let admin = Identity::new();
    let queue = ManualQueueProvider::new(admin, AuditBus::default());
    let id = queue.resolve(Identity::new(), &conflict("task")).unwrap();
    assert_eq!(queue.pending_count(), 1);

    let outsider = Identity::new();
    let err = queue
        .submit_resolution(outsider, id, ReviewDecision::A, Digest::of("a"))
        .unwrap_err();
    assert!(matches!(err, StrategyError::Unauthorized { .. }));
    assert_eq!(queue.pending_count(), 1);

    queue
        .submit_resolution(admin, id, ReviewDecision::CustomMerge, Digest::of("hand-merged"))
        .unwrap();
    assert_eq!(queue.pending_count(), 0);

    match queue.queue_entry(id).unwrap().status {
        QueueStatus::Resolved { resolved_by, decision, resolution_hash, .. } => {
            assert_eq!(resolved_by, admin);
            assert_eq!(decision, ReviewDecision::CustomMerge);
            assert_eq!(resolution_hash, Digest::of("hand-merged"));
        }
        QueueStatus::Pending => panic!("entry should be resolved"),
    }

    let err = queue
        .submit_resolution(admin, id, ReviewDecision::B, Digest::of("b"))
        .unwrap_err();
    assert!(matches!(err, StrategyError::AlreadyResolved(_)));
    assert_eq!(queue.pending_count(), 0);

    // The resolution record still documents the hand-off, not the decision.
    let record = queue.get_resolution(id).unwrap();
    assert_eq!(record.winner, Winner::Manual);
    assert!(record.merged_hash.is_zero());
}

#[test]
fn invalid_queue_id() {
    let admin = Identity::new();
    let queue = ManualQueueProvider::new(admin, AuditBus::default());
    queue.resolve(Identity::new(), &conflict("task")).unwrap();

    for bad in [0, 2, u64::MAX] {
        assert!(matches!(
            queue.submit_resolution(admin, bad, ReviewDecision::A, Digest::ZERO),
            Err(StrategyError::InvalidId(id)) if id == bad
        ));
    }
    assert_eq!(queue.pending_count(), 1);
}

#[test]
fn invalid_winner_code() {
    let admin = Identity::new();
    let queue = ManualQueueProvider::new(admin, AuditBus::default());
    let id = queue.resolve(Identity::new(), &conflict("task")).unwrap();

    assert!(matches!(
        queue.submit_resolution_code(admin, id, 3, Digest::ZERO),
        Err(StrategyError::InvalidWinner(3))
    ));
    assert_eq!(queue.pending_count(), 1);

    queue.submit_resolution_code(admin, id, 1, Digest::of("b")).unwrap();
    assert_eq!(queue.pending_count(), 0);
}

#[test]
fn decision_codes_roundtrip() {
    for d in [ReviewDecision::A, ReviewDecision::B, ReviewDecision::CustomMerge] {
        assert_eq!(ReviewDecision::from_code(d.code()).unwrap(), d);
    }
}

// ── Reviewers ────────────────────────────────────────────────────

#[test]
fn admin_manages_reviewers() {
    let admin = Identity::new();
    let bus = AuditBus::default();
    let mut rx = bus.subscribe();
    let queue = ManualQueueProvider::new(admin, bus);
    let reviewer = Identity::new();

    assert!(queue.is_reviewer(&admin));
    assert!(!queue.is_reviewer(&reviewer));

    queue.set_reviewer(admin, reviewer, true).unwrap();
    assert!(queue.is_reviewer(&reviewer));
    assert_eq!(rx.try_recv().unwrap(), AuditEvent::ReviewerSet { reviewer, enabled: true });

    let id = queue.resolve(Identity::new(), &conflict("task")).unwrap();
    queue.set_reviewer(admin, reviewer, false).unwrap();
    assert!(matches!(
        queue.submit_resolution(reviewer, id, ReviewDecision::A, Digest::ZERO),
        Err(StrategyError::Unauthorized { .. })
    ));
}

#[test]
fn reviewer_admin_follows_shared_authority() {
    let admin = Identity::new();
    let authority = Authority::new(admin);
    let queue = ManualQueueProvider::with_authority(authority.clone(), AuditBus::default());
    let successor = Identity::new();
    let reviewer = Identity::new();

    authority.replace(successor);
    assert_eq!(queue.admin(), successor);
    assert!(matches!(
        queue.set_reviewer(admin, reviewer, true),
        Err(StrategyError::Unauthorized { .. })
    ));
    queue.set_reviewer(successor, reviewer, true).unwrap();
    assert!(queue.is_reviewer(&reviewer));
}

#[test]
fn non_admin_cannot_add_reviewer() {
    let queue = ManualQueueProvider::new(Identity::new(), AuditBus::default());
    let intruder = Identity::new();
    assert!(matches!(
        queue.set_reviewer(intruder, intruder, true),
        Err(StrategyError::Unauthorized { .. })
    ));
    assert!(!queue.is_reviewer(&intruder));
}

// ── Triage ordering ──────────────────────────────────────────────

#[test]
fn pending_entries_ordered_by_priority() {
    let admin = Identity::new();
    let queue = ManualQueueProvider::new(admin, AuditBus::default());
    let low = queue.resolve(Identity::new(), &hinted("low", -1)).unwrap();
    let high = queue.resolve(Identity::new(), &hinted("high", 10)).unwrap();
    let mid = queue.resolve(Identity::new(), &hinted("mid", 0)).unwrap();
    let mid_later = queue.resolve(Identity::new(), &hinted("mid2", 0)).unwrap();

    let order: Vec<u64> = queue.pending_entries().into_iter().map(|(id, _)| id).collect();
    assert_eq!(order, vec![high, mid, mid_later, low]);

    queue.submit_resolution(admin, high, ReviewDecision::A, Digest::ZERO).unwrap();
    let order: Vec<u64> = queue.pending_entries().into_iter().map(|(id, _)| id).collect();
    assert_eq!(order, vec![mid, mid_later, low]);
}
