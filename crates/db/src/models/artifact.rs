//! Artifact row model.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use scenesmith_core::types::Timestamp;

/// A row from the `artifacts` table: one content-addressed compiled body.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ArtifactRow {
    pub id: Uuid,
    pub project_id: Uuid,
    /// SHA-256 of the compiled body, lowercase hex. Unique per project.
    pub checksum: String,
    pub url: String,
    pub size_bytes: i64,
    pub created_at: Timestamp,
}
