//! PostgreSQL-backed audit store.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use super::domain::{AuditId, AuditRecord, FeatureSet};
use super::repository::{AuditStore, StoreError};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS audit_records (
    seq BIGSERIAL,
    audit_id TEXT PRIMARY KEY,
    name TEXT,
    phone TEXT,
    email TEXT,
    features JSONB NOT NULL,
    score JSONB NOT NULL DEFAULT 'null'::jsonb,
    decision JSONB NOT NULL DEFAULT 'null'::jsonb,
    explanation JSONB NOT NULL DEFAULT 'null'::jsonb,
    model_version JSONB NOT NULL DEFAULT 'null'::jsonb,
    raw_transaction_text TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS audit_records_created_at_idx
    ON audit_records (created_at DESC, seq DESC);
"#;

const SELECT_COLUMNS: &str = "audit_id, name, phone, email, features, score, decision, \
     explanation, model_version, raw_transaction_text, created_at";

pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and makes sure the audit table exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        tracing::info!("audit record schema applied");
        Ok(())
    }

    fn map_row(row: PgRow) -> Result<AuditRecord, StoreError> {
        let features: Json<FeatureSet> = row
            .try_get("features")
            .map_err(|err| StoreError::Corrupt(err.to_string()))?;

        Ok(AuditRecord {
            audit_id: AuditId(row.try_get("audit_id")?),
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
            features: features.0,
            score: json_column(&row, "score")?,
            decision: json_column(&row, "decision")?,
            explanation: json_column(&row, "explanation")?,
            model_version: json_column(&row, "model_version")?,
            raw_transaction_text: row.try_get("raw_transaction_text")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn json_column(row: &PgRow, column: &str) -> Result<serde_json::Value, StoreError> {
    row.try_get::<Json<serde_json::Value>, _>(column)
        .map(|value| value.0)
        .map_err(|err| StoreError::Corrupt(err.to_string()))
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn insert(&self, record: AuditRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO audit_records (audit_id, name, phone, email, features, score, decision, \
             explanation, model_version, raw_transaction_text, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(record.audit_id.as_str())
        .bind(&record.name)
        .bind(&record.phone)
        .bind(&record.email)
        .bind(Json(&record.features))
        .bind(Json(&record.score))
        .bind(Json(&record.decision))
        .bind(Json(&record.explanation))
        .bind(Json(&record.model_version))
        .bind(&record.raw_transaction_text)
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(StoreError::Conflict(record.audit_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: &AuditId) -> Result<Option<AuditRecord>, StoreError> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM audit_records WHERE audit_id = $1");
        let row = sqlx::query(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::map_row).transpose()
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<AuditRecord>, StoreError> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM audit_records \
             ORDER BY created_at DESC, seq DESC LIMIT $1"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::map_row).collect()
    }
}
