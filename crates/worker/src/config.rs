//! Worker configuration loaded from environment variables.

use std::time::Duration;

use scenesmith_core::retry::RetryPolicy;
use scenesmith_pipeline::ManagerConfig;

/// Worker process configuration.
///
/// All fields except the database URL have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Maximum number of jobs driven concurrently (default: `4`).
    pub concurrency: usize,
    /// How often the dispatcher polls for pending jobs (default: `500` ms).
    pub poll_interval: Duration,
    /// Timeout for one generation attempt (default: `120` s).
    pub generation_timeout: Duration,
    /// Timeout for one storage attempt (default: `30` s).
    pub storage_timeout: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default  |
    /// |---------------------------|----------|
    /// | `DATABASE_URL`            | required |
    /// | `WORKER_CONCURRENCY`      | `4`      |
    /// | `WORKER_POLL_INTERVAL_MS` | `500`    |
    /// | `GENERATION_TIMEOUT_SECS` | `120`    |
    /// | `STORAGE_TIMEOUT_SECS`    | `30`     |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let concurrency: usize = std::env::var("WORKER_CONCURRENCY")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("WORKER_CONCURRENCY must be a valid usize");

        let poll_interval_ms: u64 = std::env::var("WORKER_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("WORKER_POLL_INTERVAL_MS must be a valid u64");

        let generation_timeout_secs: u64 = std::env::var("GENERATION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("GENERATION_TIMEOUT_SECS must be a valid u64");

        let storage_timeout_secs: u64 = std::env::var("STORAGE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("STORAGE_TIMEOUT_SECS must be a valid u64");

        Self {
            database_url,
            concurrency,
            poll_interval: Duration::from_millis(poll_interval_ms),
            generation_timeout: Duration::from_secs(generation_timeout_secs),
            storage_timeout: Duration::from_secs(storage_timeout_secs),
        }
    }

    /// The manager configuration derived from the worker's timeouts.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            generation_timeout: self.generation_timeout,
            storage_timeout: self.storage_timeout,
            retry: RetryPolicy::default(),
        }
    }
}
