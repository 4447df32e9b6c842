use std::sync::Arc;

use super::domain::{AuditId, AuditRecord};
use super::repository::{AuditStore, StoreError};

/// Hard cap on a single listing.
pub const MAX_LIST_LIMIT: usize = 200;

/// Read-only access to stored audit records. Every call goes to the store.
pub struct AuditQuery<R> {
    store: Arc<R>,
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("audit record {0} not found")]
    NotFound(AuditId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<R> AuditQuery<R>
where
    R: AuditStore + 'static,
{
    pub fn new(store: Arc<R>) -> Self {
        Self { store }
    }

    /// Newest records first; `limit` is clamped to [`MAX_LIST_LIMIT`].
    pub async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<AuditRecord>, QueryError> {
        let limit = limit.unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT);
        let mut records = self.store.list_recent(limit).await?;
        records.truncate(limit);
        Ok(records)
    }

    pub async fn find_by_id(&self, id: &AuditId) -> Result<AuditRecord, QueryError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| QueryError::NotFound(id.clone()))
    }
}
