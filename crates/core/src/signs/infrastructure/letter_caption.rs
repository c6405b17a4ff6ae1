use ab_glyph::{FontRef, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::shared::frame::Frame;

const FONT_BYTES: &[u8] = include_bytes!("../../../assets/DejaVuSans-Bold.ttf");

/// Caption height as a fraction of the frame height (about 38 px at 640).
const CAPTION_HEIGHT_RATIO: f32 = 0.06;
const MIN_CAPTION_PX: f32 = 8.0;

/// Burns the uppercase letter under each gesture: white text over a black
/// drop shadow, centered near the bottom edge.
pub struct LetterCaption {
    font: FontRef<'static>,
}

impl LetterCaption {
    pub fn new() -> Result<Self, InvalidFont> {
        Ok(Self {
            font: FontRef::try_from_slice(FONT_BYTES)?,
        })
    }

    /// Returns a copy of `frame` with `key` drawn as an uppercase label.
    pub fn render(&self, frame: &Frame, key: char) -> Result<Frame, String> {
        if frame.channels() != 3 {
            return Err(format!("expected RGB, got {} channels", frame.channels()));
        }
        let (width, height) = (frame.width(), frame.height());
        let mut img = RgbImage::from_raw(width, height, frame.data().to_vec())
            .ok_or("frame data does not match its dimensions")?;

        let label: String = key.to_uppercase().collect();
        let scale = PxScale::from((height as f32 * CAPTION_HEIGHT_RATIO).max(MIN_CAPTION_PX));
        let (text_w, text_h) = text_size(scale, &self.font, &label);

        let x = (width as i32 - text_w as i32) / 2;
        let y = height as i32 - height as i32 / 16 - text_h as i32;
        let shadow = (height as i32 / 320).max(1);

        draw_text_mut(
            &mut img,
            Rgb([0, 0, 0]),
            x + shadow,
            y + shadow,
            scale,
            &self.font,
            &label,
        );
        draw_text_mut(&mut img, Rgb([255, 255, 255]), x, y, scale, &self.font, &label);

        Ok(Frame::new(img.into_raw(), width, height, 3, frame.index()))
    }
}
