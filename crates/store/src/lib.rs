//! Content-addressed artifact storage.
//!
//! Compiled scene bodies are stored under their SHA-256 checksum, scoped
//! by project. Storing the same body twice is a no-op that returns the
//! existing location, so retries and re-runs never duplicate data. URLs
//! handed to execution contexts are signed and expiring (see [`signing`]).

pub mod local;
pub mod memory;
pub mod signing;

use async_trait::async_trait;
use uuid::Uuid;

use scenesmith_core::error::PipelineError;

pub use local::LocalArtifactStore;
pub use memory::MemoryArtifactStore;
pub use signing::{SignedUrlError, UrlSigner};

/// File extension for compiled scene artifacts.
pub const ARTIFACT_EXTENSION: &str = "csc";

/// Errors from artifact storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not persist or read the artifact. Transient:
    /// the pipeline retries these.
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// The requested artifact does not exist.
    #[error("Artifact not found: {0}")]
    NotFound(String),
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        PipelineError::StorageFailed(e.to_string())
    }
}

/// Location and identity of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// SHA-256 checksum of the body, lowercase hex.
    pub checksum: String,
    /// Backend-specific location, e.g. `artifacts/{project}/{checksum}.csc`.
    pub url: String,
    pub size_bytes: u64,
}

/// Storage seam for compiled artifacts. Implementations must be
/// idempotent on `put`: storing a body that already exists returns the
/// existing artifact without rewriting it.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store a compiled body under its content address.
    async fn put(
        &self,
        project_id: Uuid,
        job_id: Uuid,
        body: &str,
    ) -> Result<StoredArtifact, StoreError>;

    /// Fetch a stored body by its URL.
    async fn get(&self, url: &str) -> Result<String, StoreError>;
}

/// Canonical artifact path for a project/checksum pair. All backends use
/// the same layout so URLs stay portable between them.
pub fn artifact_path(project_id: Uuid, checksum: &str) -> String {
    format!("artifacts/{project_id}/{checksum}.{ARTIFACT_EXTENSION}")
}
