//! Scene reference row model.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use scenesmith_core::types::Timestamp;

/// A row from the `scene_references` table: one slot in a project's
/// timeline, pointing at the build job that produces its artifact.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SceneReferenceRow {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Zero-based timeline position, unique per project.
    pub ordinal: i32,
    pub description: String,
    /// Current revision of this scene. Bumped on every edit.
    pub revision: i32,
    pub build_job_id: Option<Uuid>,
    pub planned_duration_secs: f64,
    /// Measured duration after a render, when it differs from plan.
    pub realized_duration_secs: Option<f64>,
    /// Free-form transition settings into the next scene.
    pub transition_spec: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
