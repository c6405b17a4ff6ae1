use super::audio_segment::AudioSegment;
use super::transcript::TranscriptWord;

/// Domain interface for speech-to-text inference on decoded audio.
///
/// Shared between concurrent requests, hence `Sync` and `&self`.
pub trait SpeechRecognizer: Send + Sync {
    fn transcribe(
        &self,
        audio: &AudioSegment,
    ) -> Result<Vec<TranscriptWord>, Box<dyn std::error::Error>>;
}
