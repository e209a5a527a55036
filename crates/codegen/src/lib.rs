//! Scene source generation.
//!
//! Turns a natural-language scene description (plus its positional
//! context in the timeline) into raw component source in the scene
//! dialect. The output of this crate is untrusted text: it always passes
//! through the sanitizer before anything executes it.

pub mod config;
pub mod extract;
pub mod http;
pub mod mock;
pub mod prompt;

use async_trait::async_trait;
use scenesmith_core::error::PipelineError;
use scenesmith_core::job::GenerationRequest;

pub use config::GeneratorConfig;
pub use http::HttpSceneGenerator;
pub use mock::MockSceneGenerator;

/// Errors from a generation attempt.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The upstream model endpoint could not be reached or answered
    /// with a non-success status.
    #[error("Generation transport error: {0}")]
    Transport(String),

    /// The endpoint answered, but the response carried no usable
    /// component source. Carries the raw output for diagnostics.
    #[error("Generation produced unusable output: {detail}")]
    UnusableOutput { detail: String, raw_output: String },
}

impl From<GenerationError> for PipelineError {
    fn from(e: GenerationError) -> Self {
        match e {
            // Unreachable endpoints are a network condition, so the job
            // retries with backoff instead of failing outright.
            GenerationError::Transport(detail) => PipelineError::TransportFailed(detail),
            GenerationError::UnusableOutput { detail, raw_output } => {
                PipelineError::GenerationFailed {
                    detail,
                    raw_output: Some(raw_output),
                }
            }
        }
    }
}

/// Seam for scene source generation. The HTTP implementation talks to a
/// model endpoint; tests inject [`MockSceneGenerator`].
#[async_trait]
pub trait SceneGenerator: Send + Sync {
    /// Generate raw component source for one scene description.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
