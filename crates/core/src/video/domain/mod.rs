pub mod artifact_store;
pub mod video_artifact;
pub mod video_writer;
