pub mod directory_artifact_store;
pub mod ffmpeg_writer;
pub mod memory_artifact_store;
