use super::audio_segment::AudioSegment;

/// Decodes an uploaded audio file (any container the implementation
/// understands) into mono PCM at `target_sample_rate`.
pub trait AudioDecoder: Send + Sync {
    /// Returns `None` when the input holds no audio stream.
    fn decode(
        &self,
        bytes: &[u8],
        target_sample_rate: u32,
    ) -> Result<Option<AudioSegment>, Box<dyn std::error::Error>>;
}
