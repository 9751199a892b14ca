use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use super::{
    Case, CaseAnalysis, CaseStatus, DerivedContent, EvidenceItem, EvidenceKind, EvidenceStore,
    FrameEvidence,
};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed evidence store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory store for tests
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to in-memory database: {}", e),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Migration {
                message: format!("Failed to run migrations: {}", e),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl EvidenceStore for SqliteStore {
    async fn create_case(&self, case: &Case) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cases (id, name, description, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&case.id)
        .bind(&case.name)
        .bind(&case.description)
        .bind(case.status.to_string())
        .bind(case.created_at.to_rfc3339())
        .bind(case.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_case(&self, id: &str) -> StorageResult<Option<Case>> {
        let row: Option<CaseRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, status, created_at, updated_at
            FROM cases
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn set_case_status(&self, id: &str, status: CaseStatus) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE cases
            SET status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::CaseNotFound {
                case_id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn create_evidence(&self, item: &EvidenceItem) -> StorageResult<()> {
        let derived = item
            .derived
            .as_ref()
            .map(|d| serde_json::to_string(d).unwrap_or_default());

        sqlx::query(
            r#"
            INSERT INTO evidence (id, case_id, kind, original_filename, storage_url, uploaded_at, derived)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.case_id)
        .bind(item.kind.to_string())
        .bind(&item.original_filename)
        .bind(&item.storage_url)
        .bind(item.uploaded_at.to_rfc3339())
        .bind(&derived)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_evidence(&self, id: &str) -> StorageResult<Option<EvidenceItem>> {
        let row: Option<EvidenceRow> = sqlx::query_as(
            r#"
            SELECT id, case_id, kind, original_filename, storage_url, uploaded_at, derived
            FROM evidence
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn get_evidence_by_case(&self, case_id: &str) -> StorageResult<Vec<EvidenceItem>> {
        let rows: Vec<EvidenceRow> = sqlx::query_as(
            r#"
            SELECT id, case_id, kind, original_filename, storage_url, uploaded_at, derived
            FROM evidence
            WHERE case_id = ?
            ORDER BY uploaded_at ASC, rowid ASC
            "#,
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn save_evidence_derived(
        &self,
        item_id: &str,
        derived: &DerivedContent,
    ) -> StorageResult<()> {
        let body = serde_json::to_string(derived).map_err(|e| StorageError::Query {
            message: format!("Failed to serialize derived content: {}", e),
        })?;

        let result = sqlx::query("UPDATE evidence SET derived = ? WHERE id = ?")
            .bind(&body)
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::EvidenceNotFound {
                evidence_id: item_id.to_string(),
            });
        }

        Ok(())
    }

    async fn create_frame(&self, frame: &FrameEvidence) -> StorageResult<()> {
        let derived = frame
            .derived
            .as_ref()
            .map(|d| serde_json::to_string(d).unwrap_or_default());

        sqlx::query(
            r#"
            INSERT INTO frames (id, parent_evidence_id, time_seconds, storage_url, derived)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&frame.id)
        .bind(&frame.parent_evidence_id)
        .bind(frame.time_seconds)
        .bind(&frame.storage_url)
        .bind(&derived)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_frames_by_evidence(
        &self,
        evidence_id: &str,
    ) -> StorageResult<Vec<FrameEvidence>> {
        let rows: Vec<FrameRow> = sqlx::query_as(
            r#"
            SELECT id, parent_evidence_id, time_seconds, storage_url, derived
            FROM frames
            WHERE parent_evidence_id = ?
            ORDER BY time_seconds ASC
            "#,
        )
        .bind(evidence_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn save_frame_derived(
        &self,
        frame_id: &str,
        derived: &DerivedContent,
    ) -> StorageResult<()> {
        let body = serde_json::to_string(derived).map_err(|e| StorageError::Query {
            message: format!("Failed to serialize derived content: {}", e),
        })?;

        sqlx::query("UPDATE frames SET derived = ? WHERE id = ?")
            .bind(&body)
            .bind(frame_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_frames_by_evidence(&self, evidence_id: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM frames WHERE parent_evidence_id = ?")
            .bind(evidence_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn save_analysis(&self, analysis: &CaseAnalysis) -> StorageResult<()> {
        let body = serde_json::to_string(analysis).map_err(|e| StorageError::Query {
            message: format!("Failed to serialize analysis: {}", e),
        })?;

        // One analysis per case, replaced wholesale on re-runs.
        sqlx::query(
            r#"
            INSERT INTO analyses (case_id, body, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(case_id) DO UPDATE SET body = excluded.body, created_at = excluded.created_at
            "#,
        )
        .bind(&analysis.case_id)
        .bind(&body)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_analysis(&self, case_id: &str) -> StorageResult<Option<CaseAnalysis>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT body FROM analyses WHERE case_id = ?")
            .bind(case_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((body,)) => {
                let analysis =
                    serde_json::from_str(&body).map_err(|e| StorageError::Query {
                        message: format!("Failed to deserialize analysis: {}", e),
                    })?;
                Ok(Some(analysis))
            }
            None => Ok(None),
        }
    }
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct CaseRow {
    id: String,
    name: String,
    description: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl From<CaseRow> for Case {
    fn from(row: CaseRow) -> Self {
        use chrono::DateTime;

        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            status: row.status.parse().unwrap_or(CaseStatus::Pending),
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&row.updated_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
        }
    }
}

#[derive(sqlx::FromRow)]
struct EvidenceRow {
    id: String,
    case_id: String,
    kind: String,
    original_filename: String,
    storage_url: String,
    uploaded_at: String,
    derived: Option<String>,
}

impl From<EvidenceRow> for EvidenceItem {
    fn from(row: EvidenceRow) -> Self {
        use chrono::DateTime;

        Self {
            id: row.id,
            case_id: row.case_id,
            kind: row.kind.parse().unwrap_or(EvidenceKind::Document),
            original_filename: row.original_filename,
            storage_url: row.storage_url,
            uploaded_at: DateTime::parse_from_rfc3339(&row.uploaded_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
            derived: row.derived.and_then(|s| serde_json::from_str(&s).ok()),
        }
    }
}

#[derive(sqlx::FromRow)]
struct FrameRow {
    id: String,
    parent_evidence_id: String,
    time_seconds: f64,
    storage_url: String,
    derived: Option<String>,
}

impl From<FrameRow> for FrameEvidence {
    fn from(row: FrameRow) -> Self {
        Self {
            id: row.id,
            parent_evidence_id: row.parent_evidence_id,
            time_seconds: row.time_seconds,
            storage_url: row.storage_url,
            derived: row.derived.and_then(|s| serde_json::from_str(&s).ok()),
        }
    }
}
