use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::domain::{AuditId, AuditRecord};

/// Storage abstraction for audit records, keyed by `audit_id`.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert(&self, record: AuditRecord) -> Result<(), StoreError>;
    async fn find_by_id(&self, id: &AuditId) -> Result<Option<AuditRecord>, StoreError>;
    /// Newest first by `created_at`, at most `limit` records.
    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditRecord>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("audit record {0} already exists")]
    Conflict(AuditId),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Process-local store for development runs and tests.
#[derive(Default, Clone)]
pub struct InMemoryAuditStore {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl InMemoryAuditStore {
    pub fn len(&self) -> usize {
        self.records.lock().expect("audit store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn insert(&self, record: AuditRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("audit store mutex poisoned");
        if guard
            .iter()
            .any(|existing| existing.audit_id == record.audit_id)
        {
            return Err(StoreError::Conflict(record.audit_id));
        }
        guard.push(record);
        Ok(())
    }

    async fn find_by_id(&self, id: &AuditId) -> Result<Option<AuditRecord>, StoreError> {
        let guard = self.records.lock().expect("audit store mutex poisoned");
        Ok(guard.iter().find(|record| &record.audit_id == id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditRecord>, StoreError> {
        let guard = self.records.lock().expect("audit store mutex poisoned");
        // Reverse insertion order first so the stable sort breaks timestamp ties newest-first.
        let mut records: Vec<AuditRecord> = guard.iter().rev().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}
