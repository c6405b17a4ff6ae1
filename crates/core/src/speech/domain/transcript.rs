#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptWord {
    pub word: String,
    pub start_time: f64,
    pub end_time: f64,
    pub confidence: f32,
}

/// Joins recognized words into the lowercase, trimmed transcript string fed
/// to the sign pipeline.
pub fn transcript_text(words: &[TranscriptWord]) -> String {
    words
        .iter()
        .map(|w| w.word.trim())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
