//! # Text Card Rendering
//!
//! Turns an annotation message into a single full-frame bitmap: a solid
//! background with the message centred on it.
//!
//! The [`TextRenderer`] trait is the seam the compositor renders through;
//! [`FontRenderer`] is the fontdue-backed implementation.

pub mod font;

pub use font::FontRenderer;

use crate::{error::Result, video::types::Frame};

/// Core trait for anything that can draw a text card
pub trait TextRenderer: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Render `text` centred on a `width`×`height` frame filled with `background`
    ///
    /// Text wider than the frame is not wrapped or scaled; it runs off the
    /// edges.
    fn render(&self, text: &str, width: u32, height: u32, background: [u8; 3]) -> Result<Frame>;
}

/// Where to place a block of text so that it appears centred
///
/// Returns the left edge and the baseline. The baseline sits at
/// `(frame_height + text_height) / 2`, `text_height` being the extent of the
/// glyphs above the baseline. Both values may be negative for oversized text.
pub fn centered_origin(frame_width: u32, frame_height: u32, text_width: u32, text_height: u32) -> (i64, i64) {
    let x = (frame_width as i64 - text_width as i64).div_euclid(2);
    let baseline = (frame_height as i64 + text_height as i64).div_euclid(2);
    (x, baseline)
}

/// Blend `color` over `base` with coverage `alpha` (0-255)
pub(crate) fn blend(base: [u8; 3], color: [u8; 3], alpha: u8) -> [u8; 3] {
    let a = alpha as u32;
    std::array::from_fn(|i| ((base[i] as u32 * (255 - a) + color[i] as u32 * a + 127) / 255) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_origin() {
        assert_eq!(centered_origin(640, 480, 200, 40), (220, 260));
        // Odd remainders round down
        assert_eq!(centered_origin(11, 11, 4, 4), (3, 7));
    }

    #[test]
    fn test_oversized_text_overflows_left() {
        let (x, _) = centered_origin(100, 50, 300, 20);
        assert_eq!(x, -100);
    }

    #[test]
    fn test_blend_extremes() {
        assert_eq!(blend([10, 20, 30], [255, 255, 255], 0), [10, 20, 30]);
        assert_eq!(blend([10, 20, 30], [255, 255, 255], 255), [255, 255, 255]);
        let mid = blend([0, 0, 0], [255, 255, 255], 128);
        assert!(mid[0] > 120 && mid[0] < 136);
    }
}
