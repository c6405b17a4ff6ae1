pub mod pipeline_logger;
pub mod sign_pipeline;
pub mod video_assembler;
