use thiserror::Error;

use super::audio_decoder::AudioDecoder;
use super::speech_recognizer::SpeechRecognizer;
use super::transcript::transcript_text;
use crate::shared::constants::SPEECH_SAMPLE_RATE;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpeechRecognitionError {
    #[error("no speech recognizer is configured")]
    Unavailable,
    #[error("no audio data provided")]
    EmptyInput,
    #[error("could not decode audio: {0}")]
    Decode(String),
    #[error("input contains no audio stream")]
    NoAudioStream,
    #[error("speech recognition failed: {0}")]
    Recognition(String),
    #[error("no speech detected")]
    NoSpeech,
}

/// Speech boundary of the pipeline: audio file bytes in, transcript out.
pub trait Transcriber: Send + Sync {
    /// Returns the lowercase, trimmed transcript. An empty transcript is
    /// reported as [`SpeechRecognitionError::NoSpeech`], never as `Ok("")`.
    fn transcribe(&self, audio: &[u8]) -> Result<String, SpeechRecognitionError>;
}

/// Decodes uploaded audio to 16 kHz mono, then runs a [`SpeechRecognizer`].
pub struct DecodingTranscriber {
    decoder: Box<dyn AudioDecoder>,
    recognizer: Box<dyn SpeechRecognizer>,
}

impl DecodingTranscriber {
    pub fn new(decoder: Box<dyn AudioDecoder>, recognizer: Box<dyn SpeechRecognizer>) -> Self {
        Self {
            decoder,
            recognizer,
        }
    }
}

impl Transcriber for DecodingTranscriber {
    fn transcribe(&self, audio: &[u8]) -> Result<String, SpeechRecognitionError> {
        if audio.is_empty() {
            return Err(SpeechRecognitionError::EmptyInput);
        }

        let segment = self
            .decoder
            .decode(audio, SPEECH_SAMPLE_RATE)
            .map_err(|e| SpeechRecognitionError::Decode(e.to_string()))?
            .ok_or(SpeechRecognitionError::NoAudioStream)?;

        if segment.is_empty() || segment.is_silent(0.0) {
            return Err(SpeechRecognitionError::NoSpeech);
        }

        let words = self
            .recognizer
            .transcribe(&segment)
            .map_err(|e| SpeechRecognitionError::Recognition(e.to_string()))?;

        let text = transcript_text(&words);
        if text.is_empty() {
            return Err(SpeechRecognitionError::NoSpeech);
        }
        Ok(text)
    }
}
