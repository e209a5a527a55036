//! Repository for the `artifacts` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::artifact::ArtifactRow;

/// Column list for `artifacts` queries.
const COLUMNS: &str = "id, project_id, checksum, url, size_bytes, created_at";

/// Provides operations for content-addressed artifact records.
pub struct ArtifactRepo;

impl ArtifactRepo {
    /// Record a stored artifact. Idempotent: re-recording an existing
    /// `(project_id, checksum)` pair returns the original row untouched.
    pub async fn record(
        pool: &PgPool,
        project_id: Uuid,
        checksum: &str,
        url: &str,
        size_bytes: i64,
    ) -> Result<ArtifactRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO artifacts (id, project_id, checksum, url, size_bytes) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (project_id, checksum) DO UPDATE SET checksum = EXCLUDED.checksum \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ArtifactRow>(&query)
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(checksum)
            .bind(url)
            .bind(size_bytes)
            .fetch_one(pool)
            .await
    }

    /// Look up an artifact by its content address.
    pub async fn find_by_checksum(
        pool: &PgPool,
        project_id: Uuid,
        checksum: &str,
    ) -> Result<Option<ArtifactRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM artifacts WHERE project_id = $1 AND checksum = $2");
        sqlx::query_as::<_, ArtifactRow>(&query)
            .bind(project_id)
            .bind(checksum)
            .fetch_optional(pool)
            .await
    }

    /// All artifacts for one project, newest first.
    pub async fn list_for_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<ArtifactRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM artifacts WHERE project_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, ArtifactRow>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }
}
