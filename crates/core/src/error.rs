//! Error types shared across the pipeline.
//!
//! [`CoreError`] covers validation and record-keeping failures.
//! [`PipelineError`] is the step-failure taxonomy that drives the retry
//! policy: transient classes retry with bounded exponential backoff,
//! permanent classes surface immediately with full diagnostic context.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure taxonomy for a build job step.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// The generation service produced unusable text (empty or unparseable).
    /// The raw output is retained for diagnostics.
    #[error("Generation failed: {detail}")]
    GenerationFailed {
        detail: String,
        raw_output: Option<String>,
    },

    /// The generation endpoint was unreachable or answered with a
    /// non-success status. Classified as transient.
    #[error("Generation transport failed: {0}")]
    TransportFailed(String),

    /// A sanitizer rule could not complete. Carries the failing rule number
    /// and an offending snippet.
    #[error("Transform failed at rule {rule}: {detail}")]
    TransformFailed {
        rule: u8,
        snippet: String,
        detail: String,
    },

    /// Transient storage or network I/O failure.
    #[error("Storage failed: {0}")]
    StorageFailed(String),

    /// A runtime throw inside a sandbox during execution.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// A pipeline step exceeded its timeout. Classified as transient.
    #[error("Step '{0}' timed out")]
    Timeout(&'static str),

    /// The job was cancelled before it could complete.
    #[error("Job cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Whether this failure class should be retried with backoff.
    ///
    /// Only I/O-shaped failures (network, storage, timeout) are transient.
    /// Malformed generator output and sanitizer violations are permanent:
    /// retrying the identical input would fail identically.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransportFailed(_) | Self::StorageFailed(_) | Self::Timeout(_)
        )
    }

    /// Structured diagnostic context persisted on the failed job row.
    ///
    /// Carries everything needed to understand the failure and to resume
    /// from the last successful step rather than restarting the whole job.
    pub fn error_context(&self) -> serde_json::Value {
        match self {
            Self::GenerationFailed { detail, raw_output } => serde_json::json!({
                "class": "generation_failed",
                "detail": detail,
                "raw_output": raw_output,
            }),
            Self::TransformFailed {
                rule,
                snippet,
                detail,
            } => serde_json::json!({
                "class": "transform_failed",
                "rule": rule,
                "snippet": snippet,
                "detail": detail,
            }),
            Self::TransportFailed(detail) => serde_json::json!({
                "class": "transport_failed",
                "detail": detail,
            }),
            Self::StorageFailed(detail) => serde_json::json!({
                "class": "storage_failed",
                "detail": detail,
            }),
            Self::ExecutionFailed(detail) => serde_json::json!({
                "class": "execution_failed",
                "detail": detail,
            }),
            Self::Timeout(step) => serde_json::json!({
                "class": "timeout",
                "step": step,
            }),
            Self::Cancelled => serde_json::json!({ "class": "cancelled" }),
            Self::Internal(detail) => serde_json::json!({
                "class": "internal",
                "detail": detail,
            }),
        }
    }
}
