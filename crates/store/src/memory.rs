//! In-memory artifact store for tests and single-process runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use scenesmith_core::hashing::sha256_hex;

use crate::{artifact_path, ArtifactStore, StoreError, StoredArtifact};

/// Map-backed artifact store. Counts writes so tests can assert
/// idempotence.
#[derive(Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bodies physically written (idempotent re-puts excluded).
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(
        &self,
        project_id: Uuid,
        job_id: Uuid,
        body: &str,
    ) -> Result<StoredArtifact, StoreError> {
        let checksum = sha256_hex(body.as_bytes());
        let url = artifact_path(project_id, &checksum);

        let mut artifacts = self.artifacts.write().await;
        if !artifacts.contains_key(&url) {
            artifacts.insert(url.clone(), body.to_string());
            self.writes.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(%job_id, %checksum, "Stored artifact");
        }

        Ok(StoredArtifact {
            checksum,
            url,
            size_bytes: body.len() as u64,
        })
    }

    async fn get(&self, url: &str) -> Result<String, StoreError> {
        self.artifacts
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(url.to_string()))
    }
}
