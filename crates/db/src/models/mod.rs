pub mod artifact;
pub mod build_job;
pub mod scene_reference;
pub mod status;
