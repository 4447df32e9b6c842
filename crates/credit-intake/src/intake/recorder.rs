use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use super::domain::{ApplicantIdentity, AuditId, AuditRecord, DecisionResult, FeatureSet};
use super::repository::{AuditStore, StoreError};

/// Builds audit records and hands them to the store exactly once.
pub struct AuditRecorder<R> {
    store: Arc<R>,
}

/// The durable write failed after scoring completed; the score is not retained.
#[derive(Debug, thiserror::Error)]
#[error("failed to persist audit record {audit_id}: {source}")]
pub struct PersistenceError {
    pub audit_id: AuditId,
    #[source]
    pub source: StoreError,
}

impl<R> AuditRecorder<R>
where
    R: AuditStore + 'static,
{
    pub fn new(store: Arc<R>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        identity: ApplicantIdentity,
        features: FeatureSet,
        decision: DecisionResult,
        raw_transaction_text: String,
    ) -> Result<AuditId, PersistenceError> {
        let audit_id = AuditId::generate();
        let ApplicantIdentity { name, phone, email } = identity;
        let DecisionResult {
            score,
            decision,
            explanation,
            model_version,
        } = decision;

        let record = AuditRecord {
            audit_id: audit_id.clone(),
            name,
            phone,
            email,
            features,
            score,
            decision,
            explanation,
            model_version,
            raw_transaction_text,
            created_at: Utc::now(),
        };

        match self.store.insert(record).await {
            Ok(()) => {
                info!(%audit_id, "audit record persisted");
                Ok(audit_id)
            }
            Err(source) => {
                error!(%audit_id, error = %source, "audit record lost after scoring");
                Err(PersistenceError { audit_id, source })
            }
        }
    }
}
