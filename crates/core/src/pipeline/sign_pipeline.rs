use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::video_assembler::{EncodingError, VideoAssembler};
use crate::signs::domain::frame_scheduler::{frames_per_char, schedule, InvalidSpeedError};
use crate::signs::domain::normalizer::normalize;
use crate::signs::domain::sign_registry::SignImageRegistry;
use crate::speech::domain::transcriber::{SpeechRecognitionError, Transcriber};
use crate::video::domain::video_artifact::VideoArtifact;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidSpeed(#[from] InvalidSpeedError),
    #[error(transparent)]
    SpeechRecognition(#[from] SpeechRecognitionError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Result of one conversion: the text that was signed and the stored video.
#[derive(Clone, Debug)]
pub struct SignOutcome {
    pub transcript: String,
    pub artifact: VideoArtifact,
}

/// Process-wide counters for the stats surface.
#[derive(Debug, Default)]
pub struct PipelineStats {
    videos_generated: AtomicU64,
}

impl PipelineStats {
    /// Called once per successfully stored artifact.
    pub fn record_video(&self) {
        self.videos_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn videos_generated(&self) -> u64 {
        self.videos_generated.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub ready: bool,
    pub supported_character_count: usize,
    pub supported_characters: Vec<char>,
    pub videos_generated: u64,
}

/// Text/speech → sign video facade: normalize → schedule → assemble.
///
/// Holds no per-request state. The registry is shared read-only and the
/// stats counter is atomic, so one pipeline can serve concurrent callers.
/// Calls block until encoding finishes.
pub struct SignPipeline {
    registry: Arc<SignImageRegistry>,
    assembler: VideoAssembler,
    transcriber: Option<Box<dyn Transcriber>>,
    stats: PipelineStats,
}

impl SignPipeline {
    pub fn new(registry: Arc<SignImageRegistry>, assembler: VideoAssembler) -> Self {
        Self {
            registry,
            assembler,
            transcriber: None,
            stats: PipelineStats::default(),
        }
    }

    /// Enables [`SignPipeline::speech_to_sign`].
    pub fn with_transcriber(mut self, transcriber: Box<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn text_to_sign(&self, text: &str, speed: f64) -> Result<SignOutcome, PipelineError> {
        self.text_to_sign_logged(text, speed, &mut NullPipelineLogger)
    }

    pub fn text_to_sign_logged(
        &self,
        text: &str,
        speed: f64,
        logger: &mut dyn PipelineLogger,
    ) -> Result<SignOutcome, PipelineError> {
        let start = Instant::now();
        let tokens = normalize(text, &self.registry);
        let glyphs = tokens.iter().filter(|t| t.is_glyph()).count();
        logger.timing("normalize", elapsed_ms(start));
        logger.metric("glyphs", glyphs as f64);
        logger.metric("placeholders", (tokens.len() - glyphs) as f64);

        let start = Instant::now();
        let plan = schedule(
            &tokens,
            speed,
            self.assembler.settings().base_frames_per_char,
        )?;
        logger.timing("schedule", elapsed_ms(start));

        let artifact = self
            .assembler
            .assemble(&plan, &self.registry, text, logger)?;
        self.stats.record_video();
        logger.info(&format!(
            "Created {} for {text:?} ({} frames)",
            artifact.name, artifact.metadata.total_frames
        ));

        Ok(SignOutcome {
            transcript: text.to_string(),
            artifact,
        })
    }

    pub fn speech_to_sign(&self, audio: &[u8], speed: f64) -> Result<SignOutcome, PipelineError> {
        self.speech_to_sign_logged(audio, speed, &mut NullPipelineLogger)
    }

    /// Transcribes `audio`, then signs the transcript. Speed is validated
    /// before transcription so a bad request does no recognition work.
    pub fn speech_to_sign_logged(
        &self,
        audio: &[u8],
        speed: f64,
        logger: &mut dyn PipelineLogger,
    ) -> Result<SignOutcome, PipelineError> {
        frames_per_char(self.assembler.settings().base_frames_per_char, speed)?;
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or(SpeechRecognitionError::Unavailable)?;

        let start = Instant::now();
        let transcript = transcriber.transcribe(audio)?;
        logger.timing("transcribe", elapsed_ms(start));
        logger.info(&format!("Recognized: {transcript:?}"));

        self.text_to_sign_logged(&transcript, speed, logger)
    }

    /// True once the registry is loaded; a pipeline cannot be built without
    /// one, so this only turns false for an empty registry.
    pub fn is_ready(&self) -> bool {
        !self.registry.is_empty()
    }

    pub fn supported_characters(&self) -> BTreeSet<char> {
        self.registry.supported_characters()
    }

    pub fn supported_character_count(&self) -> usize {
        self.registry.len()
    }

    pub fn videos_generated(&self) -> u64 {
        self.stats.videos_generated()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            ready: self.is_ready(),
            supported_character_count: self.supported_character_count(),
            supported_characters: self.supported_characters().into_iter().collect(),
            videos_generated: self.videos_generated(),
        }
    }

    /// Location of a previously generated video by its exact name.
    pub fn locate(&self, name: &str) -> Option<String> {
        self.assembler.store().locate(name)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
