//! Postgres persistence for the scene pipeline.
//!
//! Thin data layer: model structs mirror table rows, repositories own the
//! SQL, and [`store::PgJobStore`] adapts the repositories to the core
//! [`JobStore`](scenesmith_core::job::JobStore) seam. No business logic
//! lives here.

pub mod models;
pub mod repositories;
pub mod store;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub use store::PgJobStore;

/// Default maximum connections for the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Connect to Postgres.
///
/// `DATABASE_MAX_CONNECTIONS` overrides the pool size.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let max_connections: u32 = std::env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CONNECTIONS);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run embedded migrations from `./migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
