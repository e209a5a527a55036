//! Build job row model and conversions to the core state machine type.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use scenesmith_core::error::CoreError;
use scenesmith_core::job::{BuildJob, BuildStep, GenerationRequest};
use scenesmith_core::types::Timestamp;

use super::status::{BuildJobStatus, StatusId};

/// A row from the `build_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BuildJobRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub scene_revision: i32,
    pub status_id: StatusId,
    /// The full [`GenerationRequest`], stored as JSONB.
    pub request: serde_json::Value,
    pub source_code: Option<String>,
    pub compiled_body: Option<String>,
    pub component_name: Option<String>,
    pub artifact_url: Option<String>,
    pub artifact_checksum: Option<String>,
    pub error_message: Option<String>,
    pub error_context: Option<serde_json::Value>,
    /// 1 = generated, 2 = transformed, 3 = stored.
    pub last_successful_step: Option<i16>,
    pub retry_count: i32,
    pub duration_override_secs: Option<f64>,
    pub cancel_requested: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BuildJobRow {
    /// Convert a row into the core job type.
    pub fn into_job(self) -> Result<BuildJob, CoreError> {
        let status = BuildJobStatus::from_id(self.status_id)?.into();
        let request: GenerationRequest = serde_json::from_value(self.request)
            .map_err(|e| CoreError::Internal(format!("Corrupt request payload: {e}")))?;
        let last_successful_step = self
            .last_successful_step
            .map(step_from_id)
            .transpose()?;

        Ok(BuildJob {
            id: self.id,
            project_id: self.project_id,
            scene_revision: self.scene_revision,
            status,
            request,
            source_code: self.source_code,
            compiled_body: self.compiled_body,
            component_name: self.component_name,
            artifact_url: self.artifact_url,
            artifact_checksum: self.artifact_checksum,
            error_message: self.error_message,
            error_context: self.error_context,
            last_successful_step,
            retry_count: self.retry_count,
            duration_override_secs: self.duration_override_secs,
            cancel_requested: self.cancel_requested,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub fn step_id(step: BuildStep) -> i16 {
    step as i16
}

pub fn step_from_id(id: i16) -> Result<BuildStep, CoreError> {
    match id {
        1 => Ok(BuildStep::Generated),
        2 => Ok(BuildStep::Transformed),
        3 => Ok(BuildStep::Stored),
        other => Err(CoreError::Validation(format!(
            "Unknown build step id {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenesmith_core::job::BuildStatus;

    fn row() -> BuildJobRow {
        let now = chrono::Utc::now();
        BuildJobRow {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            scene_revision: 3,
            status_id: BuildJobStatus::Transforming.id(),
            request: serde_json::to_value(GenerationRequest::new("spinning logo", 0, 2.0))
                .unwrap(),
            source_code: Some("export default component X { <Stage /> }".into()),
            compiled_body: None,
            component_name: None,
            artifact_url: None,
            artifact_checksum: None,
            error_message: None,
            error_context: None,
            last_successful_step: Some(1),
            retry_count: 0,
            duration_override_secs: None,
            cancel_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_to_core_job() {
        let job = row().into_job().unwrap();
        assert_eq!(job.status, BuildStatus::Transforming);
        assert_eq!(job.last_successful_step, Some(BuildStep::Generated));
        assert_eq!(job.request.description, "spinning logo");
    }

    #[test]
    fn corrupt_request_payload_is_internal_error() {
        let mut bad = row();
        bad.request = serde_json::json!({"not": "a request"});
        assert!(matches!(bad.into_job(), Err(CoreError::Internal(_))));
    }

    #[test]
    fn step_ids_roundtrip() {
        for step in [BuildStep::Generated, BuildStep::Transformed, BuildStep::Stored] {
            assert_eq!(step_from_id(step_id(step)).unwrap(), step);
        }
        assert!(step_from_id(4).is_err());
    }
}
