use crate::shared::constants::SUPPORTED_ALPHABET;
use crate::shared::frame::Frame;

/// Returns the registry key for `c`: its lowercase form when that is a
/// single ASCII letter or digit, or `None` for anything else.
pub fn gesture_key(c: char) -> Option<char> {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) if SUPPORTED_ALPHABET.contains(l) => Some(l),
        _ => None,
    }
}

/// The still image showing the sign for a single character.
#[derive(Clone, Debug)]
pub struct GestureImage {
    key: char,
    frame: Frame,
}

impl GestureImage {
    /// Returns `None` when `key` is not a letter or digit.
    pub fn new(key: char, frame: Frame) -> Option<Self> {
        gesture_key(key).map(|key| Self { key, frame })
    }

    pub fn key(&self) -> char {
        self.key
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }
}
