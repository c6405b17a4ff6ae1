use std::path::{Path, PathBuf};

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::speech::domain::audio_segment::AudioSegment;
use crate::speech::domain::speech_recognizer::SpeechRecognizer;
use crate::speech::domain::transcript::TranscriptWord;

/// Speech recognizer using whisper.cpp via whisper-rs.
///
/// The model is loaded once; each call creates its own inference state, so a
/// single recognizer can serve concurrent requests.
pub struct WhisperRecognizer {
    model_path: PathBuf,
    ctx: WhisperContext,
}

impl WhisperRecognizer {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !model_path.exists() {
            return Err(format!("Whisper model not found at: {}", model_path.display()).into());
        }
        let ctx = WhisperContext::new_with_params(
            model_path.to_str().ok_or("Invalid model path")?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| format!("Failed to load Whisper model: {e}"))?;

        Ok(Self {
            model_path: model_path.to_path_buf(),
            ctx,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn transcribe(
        &self,
        audio: &AudioSegment,
    ) -> Result<Vec<TranscriptWord>, Box<dyn std::error::Error>> {
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| format!("Failed to create Whisper state: {e}"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 0 });
        params.set_language(Some("en"));
        params.set_translate(false);
        params.set_token_timestamps(true);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(num_cpus().min(4) as i32);

        state
            .full(params, audio.samples())
            .map_err(|e| format!("Whisper inference failed: {e}"))?;

        let mut words: Vec<TranscriptWord> = Vec::new();

        for seg_idx in 0..state.full_n_segments() {
            let segment = match state.get_segment(seg_idx) {
                Some(s) => s,
                None => continue,
            };

            let mut segment_start = true;
            for tok_idx in 0..segment.n_tokens() {
                let token = match segment.get_token(tok_idx) {
                    Some(t) => t,
                    None => continue,
                };
                let text = match token.to_str() {
                    Ok(t) => t,
                    Err(_) => continue,
                };

                // Special tokens look like [_BEG_], [_SOT_], <|endoftext|>.
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed.starts_with('[') || trimmed.starts_with('<') {
                    continue;
                }

                let token_data = token.token_data();
                let prob = token.token_probability();
                // Token timestamps are in centiseconds.
                let start_time = token_data.t0 as f64 / 100.0;
                let end_time = token_data.t1 as f64 / 100.0;

                // Whisper tokens are sub-word pieces; a leading space marks
                // the start of a new word.
                let continues_word = !segment_start && !text.starts_with(' ');
                segment_start = false;
                match words.last_mut() {
                    Some(last) if continues_word => {
                        last.word.push_str(trimmed);
                        last.end_time = last.end_time.max(end_time);
                        last.confidence = last.confidence.min(prob);
                    }
                    _ => words.push(TranscriptWord {
                        word: trimmed.to_string(),
                        start_time,
                        end_time,
                        confidence: prob,
                    }),
                }
            }
        }

        Ok(words)
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
