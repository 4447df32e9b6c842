//! Applicant intake: normalization, transaction features, scoring, and the audit trail.

pub mod domain;
pub mod normalizer;
pub mod pg_store;
pub mod query;
pub mod recorder;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod transactions;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicantForm, ApplicantIdentity, AuditId, AuditRecord, DecisionResult, FeatureSet,
    IntakeSubmission,
};
pub use normalizer::{normalize, NormalizedApplicant};
pub use pg_store::PgAuditStore;
pub use query::{AuditQuery, QueryError, MAX_LIST_LIMIT};
pub use recorder::{AuditRecorder, PersistenceError};
pub use repository::{AuditStore, InMemoryAuditStore, StoreError};
pub use router::intake_router;
pub use scoring::{HttpScoringClient, ScoringError, ScoringService};
pub use service::{CreditIntakeService, IntakeOutcome, IntakeServiceError};
pub use transactions::{extract, ExtractionDegraded, TransactionSummary};
