//! The build job manager: drives one claimed job through the state
//! machine.
//!
//! Step order is generating, transforming, storing. Transient failures
//! (network, storage I/O, timeouts) retry with jittered exponential backoff up to
//! the policy's attempt bound; permanent failures (unusable generator
//! output, sanitizer violations) fail immediately and store a placeholder
//! artifact under the job's component name so the timeline keeps a
//! resolvable slot. Cancellation is honored while the job is pending or
//! generating; once transformation has begun the job runs to completion
//! of its current step.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use scenesmith_codegen::SceneGenerator;
use scenesmith_core::error::{CoreError, PipelineError};
use scenesmith_core::job::{BuildJob, BuildStatus, BuildStep, GenerationRequest, JobStore};
use scenesmith_core::naming::{derive_component_name, unique_component_name};
use scenesmith_core::placeholder::placeholder_body;
use scenesmith_core::retry::RetryPolicy;
use scenesmith_core::sanitize::{extract_declared_name, sanitize, SanitizeOptions};
use scenesmith_store::{ArtifactStore, StoredArtifact};

use crate::events::{JobEvent, JobEventBus};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for the pipeline manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Timeout for one generation attempt.
    pub generation_timeout: Duration,
    /// Timeout for one storage attempt.
    pub storage_timeout: Duration,
    /// Backoff policy for transient step failures.
    pub retry: RetryPolicy,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(120),
            storage_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

pub struct BuildJobManager {
    jobs: Arc<dyn JobStore>,
    generator: Arc<dyn SceneGenerator>,
    artifacts: Arc<dyn ArtifactStore>,
    events: Arc<JobEventBus>,
    config: ManagerConfig,
}

impl BuildJobManager {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        generator: Arc<dyn SceneGenerator>,
        artifacts: Arc<dyn ArtifactStore>,
        events: Arc<JobEventBus>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            jobs,
            generator,
            artifacts,
            events,
            config,
        }
    }

    /// Submit a new build job for one scene revision.
    pub async fn submit(
        &self,
        project_id: Uuid,
        scene_revision: i32,
        request: GenerationRequest,
    ) -> Result<Uuid, CoreError> {
        if request.description.trim().is_empty() {
            return Err(CoreError::Validation("Scene description is empty".into()));
        }
        if !request.target_duration_secs.is_finite() || request.target_duration_secs <= 0.0 {
            return Err(CoreError::Validation(format!(
                "Target duration must be positive, got {}",
                request.target_duration_secs
            )));
        }

        let job = BuildJob::new(project_id, scene_revision, request);
        let job_id = job.id;
        self.jobs.insert(job).await?;

        tracing::info!(%job_id, %project_id, scene_revision, "Submitted build job");
        self.events
            .publish(JobEvent::new("job.submitted", job_id, project_id));
        Ok(job_id)
    }

    /// Flag a job for cancellation. The flag is honored at the next
    /// cancellation point (claim, or the end of generation).
    pub async fn cancel(&self, job_id: Uuid) -> Result<(), CoreError> {
        let job = self.jobs.get(job_id).await?;
        if job.status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "Job {job_id} is already terminal ({})",
                job.status.as_str()
            )));
        }
        self.jobs.request_cancel(job_id).await?;
        self.events
            .publish(JobEvent::new("job.cancel_requested", job_id, job.project_id));
        Ok(())
    }

    /// Claim and run the oldest pending job. Returns the job id, or
    /// `None` when nothing was pending.
    pub async fn run_next(&self, cancel: &CancellationToken) -> Result<Option<Uuid>, CoreError> {
        let Some(job) = self.jobs.claim_next().await? else {
            return Ok(None);
        };
        let job_id = job.id;
        tracing::info!(%job_id, "Claimed build job");
        self.drive(job, cancel).await?;
        Ok(Some(job_id))
    }

    /// Re-enter a failed job at the step after its last success. Steps
    /// that already completed are never re-run.
    pub async fn resume(&self, job_id: Uuid, cancel: &CancellationToken) -> Result<(), CoreError> {
        let mut job = self.jobs.get(job_id).await?;
        let status = job.reopen_for_resume()?;
        self.jobs.update(&job).await?;

        tracing::info!(%job_id, status = status.as_str(), "Resuming build job");
        self.events.publish(
            JobEvent::new("job.resumed", job_id, job.project_id)
                .with_payload(serde_json::json!({ "status": status.as_str() })),
        );
        self.drive(job, cancel).await
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    async fn drive(&self, mut job: BuildJob, cancel: &CancellationToken) -> Result<(), CoreError> {
        loop {
            match job.status {
                BuildStatus::Generating => {
                    if self.cancellation_requested(&job).await? {
                        return self.finish_cancelled(&mut job).await;
                    }
                    match self.generate_with_retries(&mut job, cancel).await {
                        Ok(source) => {
                            job.source_code = Some(source);
                            job.record_step(BuildStep::Generated);
                            job.advance(BuildStatus::Transforming)?;
                            self.jobs.update(&job).await?;
                            self.publish_step(&job, BuildStep::Generated);

                            // Last cancellation point: storing is never
                            // interrupted once transformation begins.
                            if self.cancellation_requested(&job).await? {
                                return self.finish_cancelled(&mut job).await;
                            }
                        }
                        Err(PipelineError::Cancelled) => {
                            return self.finish_cancelled(&mut job).await;
                        }
                        Err(err) if err.is_transient() => {
                            // Retries exhausted; resumable from scratch.
                            return self.finish_failed(&mut job, err).await;
                        }
                        Err(err) => {
                            return self.fail_with_placeholder(&mut job, err).await;
                        }
                    }
                }
                BuildStatus::Transforming => match self.transform(&mut job).await {
                    Ok(()) => {
                        job.record_step(BuildStep::Transformed);
                        job.advance(BuildStatus::Storing)?;
                        self.jobs.update(&job).await?;
                        self.publish_step(&job, BuildStep::Transformed);
                    }
                    Err(err) => {
                        return self.fail_with_placeholder(&mut job, err).await;
                    }
                },
                BuildStatus::Storing => {
                    match self.store_with_retries(&mut job).await {
                        Ok(stored) => {
                            job.artifact_url = Some(stored.url);
                            job.artifact_checksum = Some(stored.checksum);
                            job.record_step(BuildStep::Stored);
                            job.advance(BuildStatus::Ready)?;
                            self.jobs.update(&job).await?;

                            tracing::info!(job_id = %job.id, "Build job ready");
                            self.events.publish(
                                JobEvent::new("job.ready", job.id, job.project_id).with_payload(
                                    serde_json::json!({
                                        "component_name": job.component_name,
                                        "artifact_url": job.artifact_url,
                                        "checksum": job.artifact_checksum,
                                    }),
                                ),
                            );
                            return Ok(());
                        }
                        Err(err) => {
                            // Compiled body is persisted; a resume re-enters
                            // at storing without regenerating anything.
                            return self.finish_failed(&mut job, err).await;
                        }
                    }
                }
                other => {
                    return Err(CoreError::Conflict(format!(
                        "Job {} cannot be driven from status {}",
                        job.id,
                        other.as_str()
                    )));
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    async fn generate_with_retries(
        &self,
        job: &mut BuildJob,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        loop {
            let attempt = tokio::select! {
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                result = tokio::time::timeout(
                    self.config.generation_timeout,
                    self.generator.generate(&job.request),
                ) => match result {
                    Ok(Ok(source)) => Ok(source),
                    Ok(Err(e)) => Err(PipelineError::from(e)),
                    Err(_) => Err(PipelineError::Timeout("generating")),
                },
            };

            match attempt {
                Ok(source) => return Ok(source),
                Err(err) => self.backoff_or_bail(job, "generating", err).await?,
            }
        }
    }

    async fn transform(&self, job: &mut BuildJob) -> Result<(), PipelineError> {
        let source = job
            .source_code
            .as_deref()
            .ok_or_else(|| PipelineError::Internal("No source to transform".into()))?;

        // A resumed job keeps its previously assigned name.
        let assigned_name = match &job.component_name {
            Some(name) => name.clone(),
            None => {
                let declared = extract_declared_name(source);
                let base = derive_component_name(&job.request.description, declared.as_deref());
                let taken: HashSet<String> = self
                    .jobs
                    .component_names(job.project_id)
                    .await
                    .map_err(|e| PipelineError::Internal(e.to_string()))?
                    .into_iter()
                    .collect();
                unique_component_name(&base, &taken)
            }
        };

        let compiled = sanitize(
            source,
            &SanitizeOptions {
                assigned_name,
                fps: job.request.fps,
            },
        )?;

        job.compiled_body = Some(compiled.body);
        job.component_name = Some(compiled.component_name);
        job.duration_override_secs = compiled.duration_override_secs;
        Ok(())
    }

    async fn store_with_retries(
        &self,
        job: &mut BuildJob,
    ) -> Result<StoredArtifact, PipelineError> {
        let body = job
            .compiled_body
            .clone()
            .ok_or_else(|| PipelineError::Internal("No compiled body to store".into()))?;

        loop {
            let attempt = match tokio::time::timeout(
                self.config.storage_timeout,
                self.artifacts.put(job.project_id, job.id, &body),
            )
            .await
            {
                Ok(Ok(stored)) => Ok(stored),
                Ok(Err(e)) => Err(PipelineError::from(e)),
                Err(_) => Err(PipelineError::Timeout("storing")),
            };

            match attempt {
                Ok(stored) => return Ok(stored),
                Err(err) => self.backoff_or_bail(job, "storing", err).await?,
            }
        }
    }

    /// On a transient failure with budget left: persist the bumped retry
    /// count, publish, sleep, and return `Ok` so the caller retries.
    /// Anything else propagates.
    async fn backoff_or_bail(
        &self,
        job: &mut BuildJob,
        step: &'static str,
        err: PipelineError,
    ) -> Result<(), PipelineError> {
        let attempts = job.retry_count as u32 + 1;
        if !err.is_transient() || !self.config.retry.should_retry(attempts) {
            return Err(err);
        }

        job.retry_count = attempts as i32;
        self.jobs
            .update(job)
            .await
            .map_err(|e| PipelineError::Internal(e.to_string()))?;

        let delay = self.config.retry.jittered_delay(attempts);
        tracing::warn!(
            job_id = %job.id,
            step,
            attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Transient step failure, backing off"
        );
        self.events.publish(
            JobEvent::new("job.retry_scheduled", job.id, job.project_id).with_payload(
                serde_json::json!({
                    "step": step,
                    "attempts": attempts,
                    "delay_ms": delay.as_millis() as u64,
                }),
            ),
        );

        tokio::time::sleep(delay).await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Terminal outcomes
    // -----------------------------------------------------------------------

    async fn cancellation_requested(&self, job: &BuildJob) -> Result<bool, CoreError> {
        if job.cancel_requested {
            return Ok(true);
        }
        // The flag may have been set after this copy was claimed.
        Ok(self.jobs.get(job.id).await?.cancel_requested)
    }

    async fn finish_cancelled(&self, job: &mut BuildJob) -> Result<(), CoreError> {
        job.mark_failed(&PipelineError::Cancelled)?;
        self.jobs.update(job).await?;

        tracing::info!(job_id = %job.id, "Build job cancelled");
        self.events
            .publish(JobEvent::new("job.cancelled", job.id, job.project_id));
        Ok(())
    }

    /// Fail without a placeholder: the failure is transient-shaped and
    /// the job is expected to be resumed.
    async fn finish_failed(&self, job: &mut BuildJob, err: PipelineError) -> Result<(), CoreError> {
        job.mark_failed(&err)?;
        self.jobs.update(job).await?;

        tracing::warn!(job_id = %job.id, error = %err, "Build job failed");
        self.events.publish(
            JobEvent::new("job.failed", job.id, job.project_id)
                .with_payload(err.error_context()),
        );
        Ok(())
    }

    /// Fail permanently and store the deterministic placeholder under the
    /// job's component name, so the timeline keeps a resolvable artifact
    /// of the planned duration. The job itself stays failed.
    async fn fail_with_placeholder(
        &self,
        job: &mut BuildJob,
        err: PipelineError,
    ) -> Result<(), CoreError> {
        let name = job
            .component_name
            .clone()
            .unwrap_or_else(|| derive_component_name(&job.request.description, None));

        job.mark_failed(&err)?;

        match self
            .artifacts
            .put(job.project_id, job.id, &placeholder_body(&name))
            .await
        {
            Ok(stored) => {
                job.component_name = Some(name);
                job.artifact_url = Some(stored.url);
                job.artifact_checksum = Some(stored.checksum);
            }
            Err(store_err) => {
                // Best effort: the failure below is the one that matters.
                tracing::warn!(
                    job_id = %job.id,
                    error = %store_err,
                    "Could not store placeholder artifact"
                );
            }
        }

        self.jobs.update(job).await?;

        tracing::warn!(job_id = %job.id, error = %err, "Build job failed permanently");
        self.events.publish(
            JobEvent::new("job.failed", job.id, job.project_id).with_payload(
                serde_json::json!({
                    "context": err.error_context(),
                    "placeholder": job.artifact_url.is_some(),
                }),
            ),
        );
        Ok(())
    }

    fn publish_step(&self, job: &BuildJob, step: BuildStep) {
        self.events.publish(
            JobEvent::new("job.step_completed", job.id, job.project_id).with_payload(
                serde_json::json!({
                    "step": step.as_str(),
                    "status": job.status.as_str(),
                    "progress_percent": job.status.progress_percent(),
                }),
            ),
        );
    }
}
