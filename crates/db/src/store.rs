//! Postgres adapter for the core [`JobStore`] seam.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use scenesmith_core::error::CoreError;
use scenesmith_core::job::{BuildJob, JobStore};

use crate::repositories::build_job_repo::BuildJobRepo;

/// Unique-violation SQLSTATE, raised by the active-revision index.
const UNIQUE_VIOLATION: &str = "23505";

/// [`JobStore`] backed by Postgres.
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_db_err(e: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return CoreError::Conflict(format!("Unique constraint violated: {db_err}"));
        }
    }
    CoreError::Internal(format!("Database error: {e}"))
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: BuildJob) -> Result<(), CoreError> {
        BuildJobRepo::insert(&self.pool, &job)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<BuildJob, CoreError> {
        let row = BuildJobRepo::get(&self.pool, id)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound {
                entity: "build_job",
                id,
            })?;
        row.into_job()
    }

    async fn update(&self, job: &BuildJob) -> Result<(), CoreError> {
        let updated = BuildJobRepo::update(&self.pool, job)
            .await
            .map_err(map_db_err)?;
        if !updated {
            return Err(CoreError::NotFound {
                entity: "build_job",
                id: job.id,
            });
        }
        Ok(())
    }

    async fn claim_next(&self) -> Result<Option<BuildJob>, CoreError> {
        match BuildJobRepo::claim_next(&self.pool).await.map_err(map_db_err)? {
            Some(row) => Ok(Some(row.into_job()?)),
            None => Ok(None),
        }
    }

    async fn request_cancel(&self, id: Uuid) -> Result<(), CoreError> {
        let updated = BuildJobRepo::request_cancel(&self.pool, id)
            .await
            .map_err(map_db_err)?;
        if !updated {
            return Err(CoreError::NotFound {
                entity: "build_job",
                id,
            });
        }
        Ok(())
    }

    async fn component_names(&self, project_id: Uuid) -> Result<Vec<String>, CoreError> {
        BuildJobRepo::component_names(&self.pool, project_id)
            .await
            .map_err(map_db_err)
    }
}
