use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scenesmith_codegen::HttpSceneGenerator;
use scenesmith_db::store::PgJobStore;
use scenesmith_pipeline::{BuildJobManager, JobEventBus};
use scenesmith_store::LocalArtifactStore;
use scenesmith_worker::{config::WorkerConfig, dispatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scenesmith_worker=debug,scenesmith_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();

    let pool = scenesmith_db::create_pool(&config.database_url).await?;
    scenesmith_db::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let generator = HttpSceneGenerator::from_env()
        .map_err(|e| anyhow::anyhow!("Generator setup failed: {e}"))?;

    let manager = Arc::new(BuildJobManager::new(
        Arc::new(PgJobStore::new(pool)),
        Arc::new(generator),
        Arc::new(LocalArtifactStore::from_env()),
        Arc::new(JobEventBus::default()),
        config.manager_config(),
    ));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    dispatcher::run(manager, config.concurrency, config.poll_interval, cancel).await;

    tracing::info!("Worker stopped");
    Ok(())
}
