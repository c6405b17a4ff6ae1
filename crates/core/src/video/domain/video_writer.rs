use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Abstracts video encoding so the assembler can write output without
/// depending on a specific codec library.
pub trait VideoWriter: Send {
    /// Opens `path` for writing. `metadata.codec` names the preferred
    /// encoder; the name of the encoder actually selected is returned.
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<String, Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes buffered packets and finalizes the container.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}

/// Creates a fresh writer for each assembled video.
pub type WriterFactory = Box<dyn Fn() -> Box<dyn VideoWriter> + Send + Sync>;
