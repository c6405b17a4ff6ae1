use thiserror::Error;

use super::normalizer::Token;
use crate::shared::constants::MAX_FRAMES_PER_CHAR;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error(
    "speed must be positive and finite, holding a character at most {max} frames; got {0}",
    max = MAX_FRAMES_PER_CHAR
)]
pub struct InvalidSpeedError(pub f64);

/// What a segment of the output video shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameSource {
    /// The gesture image registered under this (lowercase) key.
    Gesture(char),
    /// The blank "no sign" frame.
    Placeholder,
}

/// One segment of the frame plan: an image held for `duration` video frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSpec {
    pub source: FrameSource,
    pub duration: u32,
}

/// Frames each character is held for at the given speed.
///
/// `round(base_frames_per_char / speed)`, never less than one frame. Speeds
/// so slow that a character would exceed [`MAX_FRAMES_PER_CHAR`] are
/// rejected.
pub fn frames_per_char(base_frames_per_char: u32, speed: f64) -> Result<u32, InvalidSpeedError> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(InvalidSpeedError(speed));
    }
    let frames = (f64::from(base_frames_per_char) / speed).round().max(1.0);
    if frames > f64::from(MAX_FRAMES_PER_CHAR) {
        return Err(InvalidSpeedError(speed));
    }
    Ok(frames as u32)
}

/// Builds the frame plan for a token sequence. Pure: identical inputs give
/// identical plans. Placeholders are paced exactly like glyphs.
pub fn schedule(
    tokens: &[Token],
    speed: f64,
    base_frames_per_char: u32,
) -> Result<Vec<FrameSpec>, InvalidSpeedError> {
    let duration = frames_per_char(base_frames_per_char, speed)?;
    Ok(tokens
        .iter()
        .map(|token| FrameSpec {
            source: match token {
                Token::Glyph(c) => FrameSource::Gesture(*c),
                Token::Placeholder => FrameSource::Placeholder,
            },
            duration,
        })
        .collect())
}

/// Total number of video frames a plan expands to.
pub fn total_frames(plan: &[FrameSpec]) -> usize {
    plan.iter().map(|spec| spec.duration as usize).sum()
}
