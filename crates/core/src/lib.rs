pub mod pipeline;
pub mod shared;
pub mod signs;
pub mod speech;
pub mod video;
