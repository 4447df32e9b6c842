use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::intake::domain::{
    ApplicantForm, AuditId, AuditRecord, DecisionResult, FeatureSet, IntakeSubmission,
};
use crate::intake::repository::{AuditStore, InMemoryAuditStore, StoreError};
use crate::intake::scoring::{ScoringError, ScoringService};
use crate::intake::{intake_router, CreditIntakeService};

pub(super) const TRANSACTIONS_CSV: &str = "date,description,amount\n\
2025-01-03,salary,10\n\
2025-01-09,groceries,20\n\
2025-01-15,utilities,30\n";

pub(super) fn form() -> ApplicantForm {
    ApplicantForm {
        name: Some("Ayesha Khan".to_string()),
        phone: Some("+92 300 1234567".to_string()),
        email: Some("ayesha@example.com".to_string()),
        income: Some("85000".to_string()),
        expenses: Some("32000".to_string()),
        dependents: Some("2".to_string()),
    }
}

pub(super) fn submission() -> IntakeSubmission {
    IntakeSubmission {
        form: form(),
        transactions: None,
    }
}

pub(super) fn submission_with_transactions(csv: &[u8]) -> IntakeSubmission {
    IntakeSubmission {
        form: form(),
        transactions: Some(csv.to_vec()),
    }
}

pub(super) fn eligible_decision() -> DecisionResult {
    DecisionResult {
        score: json!(0.82),
        decision: json!("eligible"),
        explanation: json!({ "feature_importances": { "income": 0.61, "expenses": 0.39 } }),
        model_version: json!("v1.2"),
    }
}

/// Scoring fake that answers with a fixed decision and remembers what it was sent.
#[derive(Default)]
pub(super) struct StubScoring {
    calls: AtomicUsize,
    seen: Mutex<Vec<FeatureSet>>,
}

impl StubScoring {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn last_features(&self) -> Option<FeatureSet> {
        self.seen.lock().expect("scoring mutex poisoned").last().cloned()
    }
}

#[async_trait]
impl ScoringService for StubScoring {
    async fn score(&self, features: &FeatureSet) -> Result<DecisionResult, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .expect("scoring mutex poisoned")
            .push(features.clone());
        Ok(eligible_decision())
    }
}

pub(super) struct TimedOutScoring;

#[async_trait]
impl ScoringService for TimedOutScoring {
    async fn score(&self, _features: &FeatureSet) -> Result<DecisionResult, ScoringError> {
        Err(ScoringError::Timeout(Duration::from_secs(20)))
    }
}

pub(super) struct RejectingScoring;

#[async_trait]
impl ScoringService for RejectingScoring {
    async fn score(&self, _features: &FeatureSet) -> Result<DecisionResult, ScoringError> {
        Err(ScoringError::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: "model not available on server; run training".to_string(),
        })
    }
}

/// Store that accepts reads but refuses every write.
#[derive(Default)]
pub(super) struct ReadOnlyStore {
    pub(super) attempts: AtomicUsize,
}

#[async_trait]
impl AuditStore for ReadOnlyStore {
    async fn insert(&self, _record: AuditRecord) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn find_by_id(&self, _id: &AuditId) -> Result<Option<AuditRecord>, StoreError> {
        Ok(None)
    }

    async fn list_recent(&self, _limit: usize) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableStore;

#[async_trait]
impl AuditStore for UnavailableStore {
    async fn insert(&self, _record: AuditRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn find_by_id(&self, _id: &AuditId) -> Result<Option<AuditRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn list_recent(&self, _limit: usize) -> Result<Vec<AuditRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service() -> (
    CreditIntakeService<StubScoring, InMemoryAuditStore>,
    Arc<StubScoring>,
    Arc<InMemoryAuditStore>,
) {
    let scoring = Arc::new(StubScoring::default());
    let store = Arc::new(InMemoryAuditStore::default());
    let service = CreditIntakeService::new(scoring.clone(), store.clone());
    (service, scoring, store)
}

pub(super) fn router_with_service<S, R>(service: CreditIntakeService<S, R>) -> axum::Router
where
    S: ScoringService + 'static,
    R: AuditStore + 'static,
{
    intake_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("feature present");
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}
