pub mod frame_scheduler;
pub mod gesture_image;
pub mod normalizer;
pub mod sign_registry;
