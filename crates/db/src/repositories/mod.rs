pub mod artifact_repo;
pub mod build_job_repo;
pub mod scene_reference_repo;
