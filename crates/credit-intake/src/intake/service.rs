use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use super::domain::{AuditId, AuditRecord, IntakeSubmission};
use super::normalizer::normalize;
use super::query::{AuditQuery, QueryError};
use super::recorder::{AuditRecorder, PersistenceError};
use super::repository::{AuditStore, StoreError};
use super::scoring::{ScoringError, ScoringService};

/// Service composing normalization, scoring, audit recording, and lookups.
pub struct CreditIntakeService<S, R> {
    scoring: Arc<S>,
    recorder: AuditRecorder<R>,
    query: AuditQuery<R>,
}

/// Result returned to the caller after a scored and persisted intake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntakeOutcome {
    pub audit_id: AuditId,
    pub score: Value,
    pub decision: Value,
    pub explanation: Value,
    pub model_version: Value,
}

impl<S, R> CreditIntakeService<S, R>
where
    S: ScoringService + 'static,
    R: AuditStore + 'static,
{
    pub fn new(scoring: Arc<S>, store: Arc<R>) -> Self {
        Self {
            scoring,
            recorder: AuditRecorder::new(store.clone()),
            query: AuditQuery::new(store),
        }
    }

    /// Normalize, score, then persist. Persistence starts only after scoring returns.
    pub async fn verify(
        &self,
        submission: IntakeSubmission,
    ) -> Result<IntakeOutcome, IntakeServiceError> {
        let applicant = normalize(submission);
        info!(
            features = applicant.features.len(),
            has_transactions = applicant.has_transaction_features(),
            "intake received"
        );

        let decision = self
            .scoring
            .score(&applicant.features)
            .await
            .map_err(|err| {
                error!(error = %err, "scoring request failed");
                err
            })?;

        let audit_id = self
            .recorder
            .record(
                applicant.identity,
                applicant.features,
                decision.clone(),
                applicant.raw_transaction_text,
            )
            .await?;

        Ok(IntakeOutcome {
            audit_id,
            score: decision.score,
            decision: decision.decision,
            explanation: decision.explanation,
            model_version: decision.model_version,
        })
    }

    pub async fn list_recent(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<AuditRecord>, IntakeServiceError> {
        Ok(self.query.list_recent(limit).await?)
    }

    pub async fn find_by_id(&self, id: &AuditId) -> Result<AuditRecord, IntakeServiceError> {
        Ok(self.query.find_by_id(id).await?)
    }
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("audit record {0} not found")]
    NotFound(AuditId),
    #[error(transparent)]
    Store(StoreError),
}

impl From<QueryError> for IntakeServiceError {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::NotFound(id) => Self::NotFound(id),
            QueryError::Store(err) => Self::Store(err),
        }
    }
}
