//! Polling dispatcher: claims pending jobs and drives them concurrently.
//!
//! One loop polls on a fixed interval; each claimed job runs in its own
//! task, bounded by a semaphore. On shutdown the loop stops claiming and
//! waits for in-flight jobs to finish.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use scenesmith_pipeline::BuildJobManager;

/// Run the dispatch loop until `cancel` is triggered.
pub async fn run(
    manager: Arc<BuildJobManager>,
    concurrency: usize,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        concurrency,
        poll_interval_ms = poll_interval.as_millis() as u64,
        "Dispatcher started"
    );

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut interval = tokio::time::interval(poll_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Dispatcher stopping, draining in-flight jobs");
                break;
            }
            _ = interval.tick() => {
                let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                    // All slots busy; claim again next tick.
                    continue;
                };
                let manager = Arc::clone(&manager);
                let shutdown = cancel.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    match manager.run_next(&shutdown).await {
                        Ok(Some(job_id)) => {
                            tracing::debug!(%job_id, "Job run finished");
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Job run errored");
                        }
                    }
                });
            }
        }
    }

    // Every permit back means every spawned job has finished.
    match semaphore.acquire_many(concurrency as u32).await {
        Ok(_) => tracing::info!("Dispatcher drained"),
        Err(_) => tracing::warn!("Dispatcher semaphore closed before drain"),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    use scenesmith_codegen::MockSceneGenerator;
    use scenesmith_core::job::{BuildStatus, GenerationRequest, InMemoryJobStore, JobStore};
    use scenesmith_pipeline::{JobEventBus, ManagerConfig};
    use scenesmith_store::MemoryArtifactStore;
    use uuid::Uuid;

    #[tokio::test]
    async fn dispatcher_drains_pending_jobs_and_stops_on_cancel() {
        let jobs = Arc::new(InMemoryJobStore::new());
        let manager = Arc::new(BuildJobManager::new(
            jobs.clone(),
            Arc::new(MockSceneGenerator::new()),
            Arc::new(MemoryArtifactStore::new()),
            Arc::new(JobEventBus::default()),
            ManagerConfig::default(),
        ));

        let project = Uuid::new_v4();
        let mut ids = Vec::new();
        for revision in 1..=3 {
            let request = GenerationRequest::new("spinning logo", revision as u32, 2.0);
            ids.push(manager.submit(project, revision, request).await.unwrap());
        }

        let cancel = CancellationToken::new();
        let dispatcher = tokio::spawn(run(
            manager,
            2,
            Duration::from_millis(1),
            cancel.clone(),
        ));

        // Poll until every job reaches a terminal state.
        for _ in 0..500 {
            let mut all_done = true;
            for id in &ids {
                if !jobs.get(*id).await.unwrap().status.is_terminal() {
                    all_done = false;
                    break;
                }
            }
            if all_done {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        cancel.cancel();
        dispatcher.await.unwrap();

        for id in ids {
            assert_eq!(jobs.get(id).await.unwrap().status, BuildStatus::Ready);
        }
    }
}
