use super::common::*;
use crate::intake::domain::{AuditId, TXN_COUNT};
use crate::intake::repository::{AuditStore, InMemoryAuditStore, StoreError};
use crate::intake::scoring::ScoringError;
use crate::intake::{CreditIntakeService, IntakeServiceError, MAX_LIST_LIMIT};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn verify_scores_and_persists_the_audit_record() {
    let (service, scoring, store) = build_service();

    let outcome = service
        .verify(submission_with_transactions(TRANSACTIONS_CSV.as_bytes()))
        .await
        .expect("intake succeeds");

    assert_eq!(scoring.calls(), 1);
    assert_eq!(outcome.score, json!(0.82));
    assert_eq!(outcome.decision, json!("eligible"));
    assert_eq!(outcome.model_version, json!("v1.2"));

    let record = store
        .find_by_id(&outcome.audit_id)
        .await
        .expect("lookup succeeds")
        .expect("record stored");
    let sent = scoring.last_features().expect("features sent");
    assert_eq!(record.features, sent);
    assert_eq!(record.features.get(TXN_COUNT), Some(3.0));
    assert_eq!(record.name.as_deref(), Some("Ayesha Khan"));
    assert_eq!(record.raw_transaction_text, TRANSACTIONS_CSV);
    assert_eq!(record.decision_result(), eligible_decision());
}

#[tokio::test]
async fn find_by_id_returns_what_intake_computed() {
    let (service, scoring, _) = build_service();

    let outcome = service.verify(submission()).await.expect("intake succeeds");
    let record = service
        .find_by_id(&outcome.audit_id)
        .await
        .expect("record found");

    assert_eq!(record.audit_id, outcome.audit_id);
    assert_eq!(Some(record.features), scoring.last_features());
    assert_eq!(record.score, outcome.score);
    assert_eq!(record.decision, outcome.decision);
    assert_eq!(record.model_version, outcome.model_version);
    assert_eq!(record.explanation, outcome.explanation);
}

#[tokio::test]
async fn identical_submissions_create_distinct_records() {
    let (service, _, store) = build_service();

    let first = service.verify(submission()).await.expect("first intake");
    let second = service.verify(submission()).await.expect("second intake");

    assert_ne!(first.audit_id, second.audit_id);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn scoring_timeout_fails_without_a_record() {
    let store = Arc::new(InMemoryAuditStore::default());
    let service = CreditIntakeService::new(Arc::new(TimedOutScoring), store.clone());

    match service.verify(submission()).await {
        Err(IntakeServiceError::Scoring(ScoringError::Timeout(_))) => {}
        other => panic!("expected scoring timeout, got {other:?}"),
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn scoring_rejection_fails_without_a_record() {
    let store = Arc::new(InMemoryAuditStore::default());
    let service = CreditIntakeService::new(Arc::new(RejectingScoring), store.clone());

    let err = service
        .verify(submission())
        .await
        .expect_err("scoring rejected");
    assert!(matches!(
        err,
        IntakeServiceError::Scoring(ScoringError::Status { .. })
    ));
    assert!(store.is_empty());
}

#[tokio::test]
async fn persistence_failure_surfaces_after_scoring() {
    let scoring = Arc::new(StubScoring::default());
    let store = Arc::new(ReadOnlyStore::default());
    let service = CreditIntakeService::new(scoring.clone(), store.clone());

    match service.verify(submission()).await {
        Err(IntakeServiceError::Persistence(err)) => {
            assert!(matches!(err.source, StoreError::Unavailable(_)));
            assert!(err.to_string().contains(err.audit_id.as_str()));
        }
        other => panic!("expected persistence error, got {other:?}"),
    }
    assert_eq!(scoring.calls(), 1, "score was requested exactly once");
    assert_eq!(store.attempts.load(Ordering::SeqCst), 1, "write not retried");
}

#[tokio::test]
async fn find_by_id_reports_not_found() {
    let (service, _, _) = build_service();

    match service.find_by_id(&AuditId("missing".to_string())).await {
        Err(IntakeServiceError::NotFound(id)) => assert_eq!(id.as_str(), "missing"),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn store_outages_are_not_reported_as_not_found() {
    let service =
        CreditIntakeService::new(Arc::new(StubScoring::default()), Arc::new(UnavailableStore));

    assert!(matches!(
        service.find_by_id(&AuditId("any".to_string())).await,
        Err(IntakeServiceError::Store(StoreError::Unavailable(_)))
    ));
    assert!(matches!(
        service.list_recent(None).await,
        Err(IntakeServiceError::Store(_))
    ));
}

#[tokio::test]
async fn list_recent_is_newest_first_and_capped() {
    let (service, _, _) = build_service();

    let mut ids = Vec::new();
    for _ in 0..(MAX_LIST_LIMIT + 5) {
        ids.push(service.verify(submission()).await.expect("intake").audit_id);
    }

    let listed = service.list_recent(None).await.expect("list succeeds");
    assert_eq!(listed.len(), MAX_LIST_LIMIT);
    assert_eq!(listed[0].audit_id, *ids.last().expect("ids recorded"));
    assert!(listed
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));

    let oversized = service
        .list_recent(Some(10_000))
        .await
        .expect("list succeeds");
    assert_eq!(oversized.len(), MAX_LIST_LIMIT);

    let small = service.list_recent(Some(3)).await.expect("list succeeds");
    assert_eq!(small.len(), 3);
    assert_eq!(small[0].audit_id, listed[0].audit_id);
}

#[tokio::test]
async fn concurrent_intakes_are_independent() {
    let (service, scoring, store) = build_service();
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move { service.verify(submission()).await }));
    }
    for handle in handles {
        handle.await.expect("task joins").expect("intake succeeds");
    }

    assert_eq!(scoring.calls(), 8);
    assert_eq!(store.len(), 8);
    let listed = service.list_recent(None).await.expect("list succeeds");
    assert!(listed
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));
}
