//! Worker process: polls for pending build jobs and drives them through
//! the pipeline.

pub mod config;
pub mod dispatcher;

pub use config::WorkerConfig;
