//! Domain logic for the scene generation pipeline.
//!
//! This crate has zero internal dependencies so it can be used by the
//! persistence layer, the pipeline driver, the runtime, and any future
//! CLI tooling alike. Everything here is either a pure function or an
//! in-memory implementation of a seam trait.

pub mod callform;
pub mod capability;
pub mod error;
pub mod hashing;
pub mod job;
pub mod naming;
pub mod placeholder;
pub mod retry;
pub mod sanitize;
pub mod timeline;
pub mod types;
