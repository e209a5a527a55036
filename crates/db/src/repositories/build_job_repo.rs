//! Repository for the `build_jobs` table.
//!
//! Status transitions go through `BuildJobStatus` from `models::status`;
//! no magic numbers in the SQL.

use sqlx::PgPool;
use uuid::Uuid;

use scenesmith_core::job::BuildJob;

use crate::models::build_job::{step_id, BuildJobRow};
use crate::models::status::BuildJobStatus;

/// Column list for `build_jobs` queries.
const COLUMNS: &str = "\
    id, project_id, scene_revision, status_id, request, \
    source_code, compiled_body, component_name, \
    artifact_url, artifact_checksum, \
    error_message, error_context, last_successful_step, retry_count, \
    duration_override_secs, cancel_requested, created_at, updated_at";

/// Provides CRUD operations for build jobs.
pub struct BuildJobRepo;

impl BuildJobRepo {
    /// Insert a new pending job.
    ///
    /// The partial unique index on `(project_id, scene_revision)` over
    /// non-terminal rows makes a duplicate active revision surface as a
    /// unique violation.
    pub async fn insert(pool: &PgPool, job: &BuildJob) -> Result<BuildJobRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO build_jobs \
                 (id, project_id, scene_revision, status_id, request, retry_count, \
                  cancel_requested, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BuildJobRow>(&query)
            .bind(job.id)
            .bind(job.project_id)
            .bind(job.scene_revision)
            .bind(BuildJobStatus::from(job.status).id())
            .bind(serde_json::to_value(&job.request).map_err(|e| sqlx::Error::Encode(Box::new(e)))?)
            .bind(job.retry_count)
            .bind(job.cancel_requested)
            .bind(job.created_at)
            .bind(job.updated_at)
            .fetch_one(pool)
            .await
    }

    /// Fetch one job by ID.
    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<BuildJobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM build_jobs WHERE id = $1");
        sqlx::query_as::<_, BuildJobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Persist the full current state of a job.
    pub async fn update(pool: &PgPool, job: &BuildJob) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE build_jobs \
             SET status_id = $2, source_code = $3, compiled_body = $4, \
                 component_name = $5, artifact_url = $6, artifact_checksum = $7, \
                 error_message = $8, error_context = $9, last_successful_step = $10, \
                 retry_count = $11, duration_override_secs = $12, \
                 cancel_requested = $13, updated_at = $14 \
             WHERE id = $1",
        )
        .bind(job.id)
        .bind(BuildJobStatus::from(job.status).id())
        .bind(&job.source_code)
        .bind(&job.compiled_body)
        .bind(&job.component_name)
        .bind(&job.artifact_url)
        .bind(&job.artifact_checksum)
        .bind(&job.error_message)
        .bind(&job.error_context)
        .bind(job.last_successful_step.map(step_id))
        .bind(job.retry_count)
        .bind(job.duration_override_secs)
        .bind(job.cancel_requested)
        .bind(job.updated_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically claim the oldest pending job, moving it to generating.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// double-claim.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<BuildJobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE build_jobs \
             SET status_id = $1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM build_jobs \
                 WHERE status_id = $2 \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BuildJobRow>(&query)
            .bind(BuildJobStatus::Generating.id())
            .bind(BuildJobStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Flag a job for cancellation.
    pub async fn request_cancel(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE build_jobs SET cancel_requested = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All component names already assigned within a project.
    pub async fn component_names(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT component_name FROM build_jobs \
             WHERE project_id = $1 AND component_name IS NOT NULL",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;
        Ok(names.into_iter().map(|(name,)| name).collect())
    }
}
