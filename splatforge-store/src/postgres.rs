//! Postgres job store
//!
//! Persists jobs in a single `jobs` table shared by the gateway and the
//! workers. All mutations after creation go through `apply_update`, which
//! runs the patch merge inside a row-locking transaction so concurrent
//! updates to the same job serialize.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use splatforge_core::domain::job::{Job, JobStatus};
use splatforge_core::domain::patch::JobPatch;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::StoreError;
use crate::store::JobStore;

/// Postgres-backed [`JobStore`].
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Wraps an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a connection pool for the given database URL and wraps it.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    /// Runs idempotent schema migrations.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id VARCHAR(12) PRIMARY KEY,
                name TEXT,
                description TEXT,
                status VARCHAR(32) NOT NULL,
                failed_step VARCHAR(64),
                external_run_id TEXT UNIQUE,
                input_path TEXT NOT NULL,
                output_path TEXT,
                error_message TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                completed_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at DESC)")
            .execute(&self.pool)
            .await?;

        tracing::info!("Database migrations completed successfully");

        Ok(())
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: Job) -> Result<Job, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, name, description, status, input_path, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&job.id)
        .bind(&job.name)
        .bind(&job.description)
        .bind(job.status.as_str())
        .bind(&job.input_path)
        .bind(job.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(job),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::AlreadyExists(job.id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, name, description, status, failed_step, external_run_id,
                   input_path, output_path, error_message, created_at, completed_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Job::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, name, description, status, failed_step, external_run_id,
                   input_path, output_path, error_message, created_at, completed_at
            FROM jobs
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    async fn apply_update(&self, id: &str, patch: JobPatch) -> Result<Job, StoreError> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE holds the row lock until commit, so two updates for the
        // same job cannot interleave their read and write.
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, name, description, status, failed_step, external_run_id,
                   input_path, output_path, error_message, created_at, completed_at
            FROM jobs
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let current = match row {
            Some(row) => Job::try_from(row)?,
            None => return Err(StoreError::NotFound(id.to_string())),
        };

        let Some(updated) = patch.apply_to(&current, Utc::now()) else {
            // Nothing staged: dropping the transaction releases the row lock
            // without writing.
            return Ok(current);
        };

        sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, failed_step = $2, external_run_id = $3,
                output_path = $4, error_message = $5, completed_at = $6
            WHERE id = $7
            "#,
        )
        .bind(updated.status.as_str())
        .bind(&updated.failed_step)
        .bind(&updated.external_run_id)
        .bind(&updated.output_path)
        .bind(&updated.error_message)
        .bind(updated.completed_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

/// Database row representation of a job.
#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    name: Option<String>,
    description: Option<String>,
    status: String,
    failed_step: Option<String>,
    external_run_id: Option<String>,
    input_path: String,
    output_path: Option<String>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::parse(&row.status).ok_or_else(|| StoreError::InvalidStatus {
            id: row.id.clone(),
            value: row.status.clone(),
        })?;

        Ok(Job {
            id: row.id,
            name: row.name,
            description: row.description,
            status,
            failed_step: row.failed_step,
            external_run_id: row.external_run_id,
            input_path: row.input_path,
            output_path: row.output_path,
            error_message: row.error_message,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}
