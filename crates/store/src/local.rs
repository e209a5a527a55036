//! Filesystem-backed artifact store.
//!
//! Layout: `{base_dir}/artifacts/{project_id}/{checksum}.csc`. Writes go
//! through a temp file plus atomic rename so a crash mid-write never
//! leaves a partial artifact under a content address.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use scenesmith_core::hashing::sha256_hex;

use crate::{artifact_path, ArtifactStore, StoreError, StoredArtifact};

pub struct LocalArtifactStore {
    base_dir: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Base directory from `ARTIFACT_DIR` (default `./artifacts-data`).
    pub fn from_env() -> Self {
        let base_dir =
            std::env::var("ARTIFACT_DIR").unwrap_or_else(|_| "./artifacts-data".into());
        Self::new(base_dir)
    }

    fn full_path(&self, url: &str) -> PathBuf {
        self.base_dir.join(url)
    }
}

fn io_err(context: &str, path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io(format!("{context} {}: {e}", path.display()))
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put(
        &self,
        project_id: Uuid,
        job_id: Uuid,
        body: &str,
    ) -> Result<StoredArtifact, StoreError> {
        let checksum = sha256_hex(body.as_bytes());
        let url = artifact_path(project_id, &checksum);
        let path = self.full_path(&url);

        let stored = StoredArtifact {
            checksum: checksum.clone(),
            url,
            size_bytes: body.len() as u64,
        };

        // Content-addressed: an existing file already holds this body.
        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_err("Failed to stat", &path, e))?
        {
            tracing::debug!(%job_id, %checksum, "Artifact already stored");
            return Ok(stored);
        }

        let parent = path
            .parent()
            .ok_or_else(|| StoreError::Io(format!("Artifact path has no parent: {}", path.display())))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err("Failed to create", parent, e))?;

        // Temp name includes the job id so concurrent writers never clash.
        let tmp = parent.join(format!(".{checksum}.{job_id}.tmp"));
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| io_err("Failed to create", &tmp, e))?;
        file.write_all(body.as_bytes())
            .await
            .map_err(|e| io_err("Failed to write", &tmp, e))?;
        // Durability before visibility: the rename must publish synced bytes.
        file.sync_all()
            .await
            .map_err(|e| io_err("Failed to sync", &tmp, e))?;
        drop(file);
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_err("Failed to rename", &tmp, e))?;

        tracing::info!(%job_id, %checksum, size_bytes = stored.size_bytes, "Stored artifact");
        Ok(stored)
    }

    async fn get(&self, url: &str) -> Result<String, StoreError> {
        let path = self.full_path(url);
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(url.to_string()))
            }
            Err(e) => Err(io_err("Failed to read", &path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());

        let stored = store
            .put(Uuid::new_v4(), Uuid::new_v4(), "X := stage({}, [])")
            .await
            .unwrap();
        assert_eq!(store.get(&stored.url).await.unwrap(), "X := stage({}, [])");
    }

    #[tokio::test]
    async fn put_is_idempotent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let project = Uuid::new_v4();

        let first = store
            .put(project, Uuid::new_v4(), "X := stage({}, [])")
            .await
            .unwrap();
        let second = store
            .put(project, Uuid::new_v4(), "X := stage({}, [])")
            .await
            .unwrap();
        assert_eq!(first, second);

        // Exactly one artifact file, no leftover temp files.
        let project_dir = dir.path().join("artifacts").join(project.to_string());
        let mut entries = tokio::fs::read_dir(&project_dir).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".csc"));
    }

    #[tokio::test]
    async fn checksum_matches_body_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let body = "Logo := stage({}, [])";

        let stored = store.put(Uuid::new_v4(), Uuid::new_v4(), body).await.unwrap();
        assert_eq!(stored.checksum, sha256_hex(body.as_bytes()));
        assert!(stored.url.contains(&stored.checksum));
    }

    #[tokio::test]
    async fn missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        assert!(matches!(
            store.get("artifacts/none/abc.csc").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
