//! The build pipeline: claims jobs, drives the state machine, and
//! publishes lifecycle events.
//!
//! One claimed job walks generating, transforming, and storing in order.
//! Transient failures retry with bounded backoff; permanent failures
//! store a placeholder artifact so the project timeline never gains a
//! gap. Every completed step is persisted, so a failed job resumes at
//! the step after its last success instead of regenerating.

pub mod events;
pub mod manager;
pub mod service;

pub use events::{JobEvent, JobEventBus};
pub use manager::{BuildJobManager, ManagerConfig};
pub use service::{JobStatusView, PipelineService};
