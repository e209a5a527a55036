//! Build job state machine types and the job store seam.
//!
//! A [`BuildJob`] is the persisted unit of work turning one scene
//! description into one compiled artifact. Its status only ever advances
//! forward along the success path or moves to `Failed`; every mutation
//! goes through the transition methods here so no caller can skip a state.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CoreError, PipelineError};
use crate::types::{Timestamp, DEFAULT_FPS};

// ---------------------------------------------------------------------------
// Status / step enums
// ---------------------------------------------------------------------------

/// Build job lifecycle status. Forward-only along the success path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Pending,
    Generating,
    Transforming,
    Storing,
    Ready,
    Failed,
}

impl BuildStatus {
    /// Whether the job can still make progress.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    /// Valid transitions: one step forward on the success path, or any
    /// non-terminal state to `Failed`.
    pub fn can_transition_to(self, to: BuildStatus) -> bool {
        use BuildStatus::*;
        matches!(
            (self, to),
            (Pending, Generating)
                | (Generating, Transforming)
                | (Transforming, Storing)
                | (Storing, Ready)
                | (Pending, Failed)
                | (Generating, Failed)
                | (Transforming, Failed)
                | (Storing, Failed)
        )
    }

    /// Coarse progress for status queries.
    pub fn progress_percent(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Generating => 25,
            Self::Transforming => 50,
            Self::Storing => 75,
            Self::Ready => 100,
            Self::Failed => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Transforming => "transforming",
            Self::Storing => "storing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(value: &str) -> Result<Self, CoreError> {
        match value {
            "pending" => Ok(Self::Pending),
            "generating" => Ok(Self::Generating),
            "transforming" => Ok(Self::Transforming),
            "storing" => Ok(Self::Storing),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown build status '{other}'"
            ))),
        }
    }
}

/// The last pipeline step that completed successfully. Persisted so a
/// failed job can resume at `last_successful_step + 1` without redoing
/// upstream work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStep {
    Generated = 1,
    Transformed = 2,
    Stored = 3,
}

impl BuildStep {
    /// The status a resumed job re-enters at, given this completed step.
    pub fn resume_status(self) -> BuildStatus {
        match self {
            Self::Generated => BuildStatus::Transforming,
            Self::Transformed => BuildStatus::Storing,
            Self::Stored => BuildStatus::Ready,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Transformed => "transformed",
            Self::Stored => "stored",
        }
    }

    pub fn from_str(value: &str) -> Result<Self, CoreError> {
        match value {
            "generated" => Ok(Self::Generated),
            "transformed" => Ok(Self::Transformed),
            "stored" => Ok(Self::Stored),
            other => Err(CoreError::Validation(format!(
                "Unknown build step '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Generation request
// ---------------------------------------------------------------------------

/// The inbound request for one scene: the description plus its positional
/// context in the timeline. Stored on the job at creation so generation
/// can run (and re-run on a pre-generation resume) without the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub description: String,
    /// Zero-based position of this scene in the timeline.
    pub ordinal: u32,
    pub previous_description: Option<String>,
    pub next_description: Option<String>,
    pub target_duration_secs: f64,
    pub fps: u32,
}

impl GenerationRequest {
    pub fn new(description: impl Into<String>, ordinal: u32, target_duration_secs: f64) -> Self {
        Self {
            description: description.into(),
            ordinal,
            previous_description: None,
            next_description: None,
            target_duration_secs,
            fps: DEFAULT_FPS,
        }
    }
}

// ---------------------------------------------------------------------------
// Build job record
// ---------------------------------------------------------------------------

/// Persisted build job row. Owned exclusively by the pipeline manager;
/// mutated only through the transition methods below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildJob {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Scene revision this job builds. At most one active job per revision.
    pub scene_revision: i32,
    pub status: BuildStatus,
    pub request: GenerationRequest,
    /// Raw generated source, persisted after generation (for diagnostics
    /// and resume).
    pub source_code: Option<String>,
    /// Compiled body, persisted after transform (for resume).
    pub compiled_body: Option<String>,
    pub component_name: Option<String>,
    pub artifact_url: Option<String>,
    pub artifact_checksum: Option<String>,
    pub error_message: Option<String>,
    pub error_context: Option<serde_json::Value>,
    pub last_successful_step: Option<BuildStep>,
    pub retry_count: i32,
    pub duration_override_secs: Option<f64>,
    pub cancel_requested: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BuildJob {
    /// Create a new pending job for one scene revision.
    pub fn new(project_id: Uuid, scene_revision: i32, request: GenerationRequest) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            scene_revision,
            status: BuildStatus::Pending,
            request,
            source_code: None,
            compiled_body: None,
            component_name: None,
            artifact_url: None,
            artifact_checksum: None,
            error_message: None,
            error_context: None,
            last_successful_step: None,
            retry_count: 0,
            duration_override_secs: None,
            cancel_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Planned duration for timeline placement.
    pub fn planned_duration_secs(&self) -> f64 {
        self.request.target_duration_secs
    }

    /// Advance along the success path, enforcing the forward-only invariant.
    pub fn advance(&mut self, to: BuildStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(to) {
            return Err(CoreError::Conflict(format!(
                "Illegal status transition {} -> {}",
                self.status.as_str(),
                to.as_str()
            )));
        }
        self.status = to;
        self.updated_at = chrono::Utc::now();
        Ok(())
    }

    /// Record a step failure. `last_successful_step` is left untouched so
    /// the job can resume there.
    pub fn mark_failed(&mut self, error: &PipelineError) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "Job {} is already terminal ({})",
                self.id,
                self.status.as_str()
            )));
        }
        self.status = BuildStatus::Failed;
        self.error_message = Some(error.to_string());
        self.error_context = Some(error.error_context());
        self.updated_at = chrono::Utc::now();
        Ok(())
    }

    /// Record a completed step and its payload-bearing side effects.
    pub fn record_step(&mut self, step: BuildStep) {
        self.last_successful_step = Some(step);
        self.updated_at = chrono::Utc::now();
    }

    /// Re-enter the state machine after a failure, at the step after
    /// `last_successful_step`. Clears the error fields.
    pub fn reopen_for_resume(&mut self) -> Result<BuildStatus, CoreError> {
        if self.status != BuildStatus::Failed {
            return Err(CoreError::Conflict(format!(
                "Only failed jobs can be resumed (job {} is {})",
                self.id,
                self.status.as_str()
            )));
        }
        let status = match self.last_successful_step {
            None => BuildStatus::Generating,
            Some(step) => step.resume_status(),
        };
        self.status = status;
        self.error_message = None;
        self.error_context = None;
        self.updated_at = chrono::Utc::now();
        Ok(status)
    }
}

// ---------------------------------------------------------------------------
// Job store seam
// ---------------------------------------------------------------------------

/// Persistence seam for build jobs. The Postgres implementation lives in
/// the db crate; [`InMemoryJobStore`] backs tests and single-process runs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job. Fails with `Conflict` when another active
    /// (non-terminal) job already claims the same scene revision.
    async fn insert(&self, job: BuildJob) -> Result<(), CoreError>;

    async fn get(&self, id: Uuid) -> Result<BuildJob, CoreError>;

    /// Persist the current state of a job.
    async fn update(&self, job: &BuildJob) -> Result<(), CoreError>;

    /// Atomically claim the next pending job, moving it to `Generating`.
    /// Returns `None` when nothing is pending.
    async fn claim_next(&self) -> Result<Option<BuildJob>, CoreError>;

    /// Flag a job for cancellation. The pipeline honors the flag only
    /// while the job is pending or generating.
    async fn request_cancel(&self, id: Uuid) -> Result<(), CoreError>;

    /// Component names already assigned within a project, for collision
    /// suffixing.
    async fn component_names(&self, project_id: Uuid) -> Result<Vec<String>, CoreError>;
}

/// In-memory job store: a map behind an async `RwLock`.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, BuildJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: BuildJob) -> Result<(), CoreError> {
        let mut jobs = self.jobs.write().await;
        let duplicate = jobs.values().any(|existing| {
            existing.project_id == job.project_id
                && existing.scene_revision == job.scene_revision
                && !existing.status.is_terminal()
        });
        if duplicate {
            return Err(CoreError::Conflict(format!(
                "An active job already claims revision {} of project {}",
                job.scene_revision, job.project_id
            )));
        }
        jobs.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<BuildJob, CoreError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "build_job",
                id,
            })
    }

    async fn update(&self, job: &BuildJob) -> Result<(), CoreError> {
        let mut jobs = self.jobs.write().await;
        if !jobs.contains_key(&job.id) {
            return Err(CoreError::NotFound {
                entity: "build_job",
                id: job.id,
            });
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn claim_next(&self) -> Result<Option<BuildJob>, CoreError> {
        let mut jobs = self.jobs.write().await;
        // Oldest pending first, matching the Postgres claim ordering.
        let next_id = jobs
            .values()
            .filter(|j| j.status == BuildStatus::Pending)
            .min_by_key(|j| j.created_at)
            .map(|j| j.id);

        match next_id {
            Some(id) => {
                let job = jobs.get_mut(&id).expect("id taken from the same map");
                job.status = BuildStatus::Generating;
                job.updated_at = chrono::Utc::now();
                Ok(Some(job.clone()))
            }
            None => Ok(None),
        }
    }

    async fn request_cancel(&self, id: Uuid) -> Result<(), CoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "build_job",
            id,
        })?;
        job.cancel_requested = true;
        job.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn component_names(&self, project_id: Uuid) -> Result<Vec<String>, CoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs
            .values()
            .filter(|j| j.project_id == project_id)
            .filter_map(|j| j.component_name.clone())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
