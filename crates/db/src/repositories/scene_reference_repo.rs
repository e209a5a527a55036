//! Repository for the `scene_references` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::scene_reference::SceneReferenceRow;

/// Column list for `scene_references` queries.
const COLUMNS: &str = "\
    id, project_id, ordinal, description, revision, build_job_id, \
    planned_duration_secs, realized_duration_secs, transition_spec, \
    created_at, updated_at";

/// Provides operations for timeline scene references.
pub struct SceneReferenceRepo;

impl SceneReferenceRepo {
    /// Create a scene reference at a timeline position.
    pub async fn insert(
        pool: &PgPool,
        project_id: Uuid,
        ordinal: i32,
        description: &str,
        planned_duration_secs: f64,
    ) -> Result<SceneReferenceRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO scene_references \
                 (id, project_id, ordinal, description, revision, planned_duration_secs) \
             VALUES ($1, $2, $3, $4, 1, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SceneReferenceRow>(&query)
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(ordinal)
            .bind(description)
            .bind(planned_duration_secs)
            .fetch_one(pool)
            .await
    }

    /// All references for a project in timeline order.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<SceneReferenceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scene_references WHERE project_id = $1 ORDER BY ordinal ASC"
        );
        sqlx::query_as::<_, SceneReferenceRow>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Re-describe a scene, bumping its revision. Returns the new revision.
    pub async fn revise(
        pool: &PgPool,
        id: Uuid,
        description: &str,
    ) -> Result<Option<i32>, sqlx::Error> {
        let revision: Option<(i32,)> = sqlx::query_as(
            "UPDATE scene_references \
             SET description = $2, revision = revision + 1, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING revision",
        )
        .bind(id)
        .bind(description)
        .fetch_optional(pool)
        .await?;
        Ok(revision.map(|(r,)| r))
    }

    /// Point a reference at the build job producing its artifact.
    pub async fn set_build_job(
        pool: &PgPool,
        id: Uuid,
        build_job_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE scene_references SET build_job_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(build_job_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the transition into the next scene.
    pub async fn set_transition(
        pool: &PgPool,
        id: Uuid,
        transition_spec: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE scene_references SET transition_spec = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(transition_spec)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the measured duration after a render.
    pub async fn set_realized_duration(
        pool: &PgPool,
        id: Uuid,
        realized_duration_secs: f64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE scene_references \
             SET realized_duration_secs = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(realized_duration_secs)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
