//! Facade over the pipeline for API-layer callers.
//!
//! [`PipelineService`] wraps the manager with the read-side operations an
//! HTTP surface needs: status snapshots and signed artifact URLs. Write
//! operations (submit, cancel, resume) delegate to the manager.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use scenesmith_core::error::CoreError;
use scenesmith_core::job::{BuildStatus, GenerationRequest, JobStore};
use scenesmith_store::UrlSigner;

use crate::manager::BuildJobManager;

// ---------------------------------------------------------------------------
// Status view
// ---------------------------------------------------------------------------

/// Point-in-time snapshot of one build job, shaped for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    pub id: Uuid,
    pub status: String,
    pub progress_percent: u8,
    pub component_name: Option<String>,
    pub artifact_url: Option<String>,
    pub error_message: Option<String>,
    pub error_context: Option<serde_json::Value>,
    pub retry_count: i32,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct PipelineService {
    manager: Arc<BuildJobManager>,
    jobs: Arc<dyn JobStore>,
    /// When present, artifact URLs handed out are signed and expiring.
    signer: Option<UrlSigner>,
}

impl PipelineService {
    pub fn new(
        manager: Arc<BuildJobManager>,
        jobs: Arc<dyn JobStore>,
        signer: Option<UrlSigner>,
    ) -> Self {
        Self {
            manager,
            jobs,
            signer,
        }
    }

    pub async fn submit(
        &self,
        project_id: Uuid,
        scene_revision: i32,
        request: GenerationRequest,
    ) -> Result<Uuid, CoreError> {
        self.manager.submit(project_id, scene_revision, request).await
    }

    pub async fn cancel(&self, job_id: Uuid) -> Result<(), CoreError> {
        self.manager.cancel(job_id).await
    }

    pub async fn resume(&self, job_id: Uuid, cancel: &CancellationToken) -> Result<(), CoreError> {
        self.manager.resume(job_id, cancel).await
    }

    pub async fn run_next(&self, cancel: &CancellationToken) -> Result<Option<Uuid>, CoreError> {
        self.manager.run_next(cancel).await
    }

    /// Status snapshot for one job.
    pub async fn status(&self, job_id: Uuid) -> Result<JobStatusView, CoreError> {
        let job = self.jobs.get(job_id).await?;
        Ok(JobStatusView {
            id: job.id,
            status: job.status.as_str().to_string(),
            progress_percent: job.status.progress_percent(),
            component_name: job.component_name,
            artifact_url: job.artifact_url,
            error_message: job.error_message,
            error_context: job.error_context,
            retry_count: job.retry_count,
        })
    }

    /// The job's artifact URL, signed when a signer is configured.
    ///
    /// Only ready jobs hand out a URL. A failed job may carry a stored
    /// placeholder on its row for timeline substitution, but that never
    /// resolves through this operation; callers see `Validation`.
    pub async fn artifact_url(&self, job_id: Uuid) -> Result<String, CoreError> {
        let job = self.jobs.get(job_id).await?;
        if job.status != BuildStatus::Ready {
            return Err(CoreError::Validation(format!(
                "Job {job_id} has no ready artifact (status {})",
                job.status.as_str()
            )));
        }
        let url = job.artifact_url.ok_or_else(|| {
            CoreError::Internal(format!("Ready job {job_id} is missing its artifact URL"))
        })?;
        Ok(match &self.signer {
            Some(signer) => signer.sign(&url),
            None => url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    use scenesmith_codegen::MockSceneGenerator;
    use scenesmith_core::job::InMemoryJobStore;
    use scenesmith_store::MemoryArtifactStore;

    use crate::events::JobEventBus;
    use crate::manager::ManagerConfig;

    fn service() -> PipelineService {
        let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let manager = Arc::new(BuildJobManager::new(
            jobs.clone(),
            Arc::new(MockSceneGenerator::new()),
            Arc::new(MemoryArtifactStore::new()),
            Arc::new(JobEventBus::default()),
            ManagerConfig::default(),
        ));
        PipelineService::new(manager, jobs, None)
    }

    #[tokio::test]
    async fn status_of_fresh_job_is_pending() {
        let service = service();
        let job_id = service
            .submit(Uuid::new_v4(), 1, GenerationRequest::new("spinning logo", 0, 2.0))
            .await
            .unwrap();

        let view = service.status(job_id).await.unwrap();
        assert_eq!(view.status, "pending");
        assert_eq!(view.progress_percent, 0);
        assert_eq!(view.artifact_url, None);
    }

    #[tokio::test]
    async fn artifact_url_before_ready_is_rejected() {
        let service = service();
        let job_id = service
            .submit(Uuid::new_v4(), 1, GenerationRequest::new("spinning logo", 0, 2.0))
            .await
            .unwrap();

        let err = service.artifact_url(job_id).await.unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[tokio::test]
    async fn failed_job_with_placeholder_hands_out_no_url() {
        let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let generator = MockSceneGenerator::new().respond_with(
            "import { readFile } from \"fs\";\n\nexport default component Evil {\n  <Stage />\n}\n",
        );
        let manager = Arc::new(BuildJobManager::new(
            jobs.clone(),
            Arc::new(generator),
            Arc::new(MemoryArtifactStore::new()),
            Arc::new(JobEventBus::default()),
            ManagerConfig::default(),
        ));
        let service = PipelineService::new(manager, jobs.clone(), None);

        let job_id = service
            .submit(Uuid::new_v4(), 1, GenerationRequest::new("spinning logo", 0, 2.0))
            .await
            .unwrap();
        service.run_next(&CancellationToken::new()).await.unwrap();

        // The row keeps the placeholder location for timeline substitution.
        let job = jobs.get(job_id).await.unwrap();
        assert_eq!(job.status, BuildStatus::Failed);
        assert!(job.artifact_url.is_some());

        let err = service.artifact_url(job_id).await.unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[tokio::test]
    async fn empty_description_is_rejected_at_submit() {
        let service = service();
        let err = service
            .submit(Uuid::new_v4(), 1, GenerationRequest::new("   ", 0, 2.0))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[tokio::test]
    async fn signed_urls_carry_expiry_and_signature() {
        let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let manager = Arc::new(BuildJobManager::new(
            jobs.clone(),
            Arc::new(MockSceneGenerator::new()),
            artifacts,
            Arc::new(JobEventBus::default()),
            ManagerConfig::default(),
        ));
        let service = PipelineService::new(manager, jobs, Some(UrlSigner::new("secret", 3600)));

        let project = Uuid::new_v4();
        let job_id = service
            .submit(project, 1, GenerationRequest::new("spinning logo", 0, 2.0))
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        service.run_next(&cancel).await.unwrap();

        let url = service.artifact_url(job_id).await.unwrap();
        assert!(url.contains("expires="));
        assert!(url.contains("sig="));
    }
}
