use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings, Metrics};
use tracing::{debug, info};

use crate::config::InterstitialConfig;
use crate::error::{RenderError, Result};
use crate::render::{blend, centered_origin, TextRenderer};
use crate::video::types::Frame;

/// Locations probed when no font is configured
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A glyph positioned along the pen line, relative to the text origin
struct PlacedGlyph {
    ch: char,
    pen_x: f32,
    metrics: Metrics,
}

/// Measured single-line layout
struct TextLayout {
    glyphs: Vec<PlacedGlyph>,
    width: u32,
    height: u32,
}

/// Text card renderer backed by a TrueType/OpenType font
pub struct FontRenderer {
    font: Font,
    font_size: f32,
    foreground: [u8; 3],
}

impl FontRenderer {
    /// Build a renderer from the interstitial settings
    ///
    /// Uses `font_path` when set, otherwise the first readable system font.
    pub fn new(config: &InterstitialConfig) -> Result<Self> {
        let path = match &config.font_path {
            Some(path) => path.clone(),
            None => Self::find_system_font().ok_or_else(|| RenderError::Unavailable {
                reason: "no font configured and no system font found".to_string(),
            })?,
        };

        Self::from_file(&path, config.font_size, config.foreground)
    }

    pub fn from_file<P: AsRef<Path>>(path: P, font_size: f32, foreground: [u8; 3]) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| RenderError::Unavailable {
            reason: format!("cannot read font {}: {}", path.display(), e),
        })?;

        let renderer = Self::from_bytes(bytes, font_size, foreground)?;
        info!("Loaded font {:?} at {}px", path, font_size);
        Ok(renderer)
    }

    pub fn from_bytes(bytes: Vec<u8>, font_size: f32, foreground: [u8; 3]) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| RenderError::Unavailable {
            reason: format!("invalid font data: {}", e),
        })?;

        Ok(Self { font, font_size, foreground })
    }

    /// First existing entry of the built-in font search list
    pub fn find_system_font() -> Option<PathBuf> {
        SYSTEM_FONT_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file())
    }

    fn layout(&self, text: &str) -> TextLayout {
        let mut glyphs = Vec::with_capacity(text.len());
        let mut pen_x = 0.0f32;
        let mut ascent = 0i32;
        let mut previous: Option<char> = None;

        for ch in text.chars() {
            if let Some(prev) = previous {
                pen_x += self.font.horizontal_kern(prev, ch, self.font_size).unwrap_or(0.0);
            }

            let metrics = self.font.metrics(ch, self.font_size);
            ascent = ascent.max(metrics.height as i32 + metrics.ymin);
            glyphs.push(PlacedGlyph { ch, pen_x, metrics });

            pen_x += metrics.advance_width;
            previous = Some(ch);
        }

        TextLayout {
            glyphs,
            width: pen_x.ceil().max(0.0) as u32,
            height: ascent.max(0) as u32,
        }
    }
}

impl TextRenderer for FontRenderer {
    fn name(&self) -> &str {
        "fontdue"
    }

    fn render(&self, text: &str, width: u32, height: u32, background: [u8; 3]) -> Result<Frame> {
        let mut frame = Frame::new_filled(width, height, background);
        let layout = self.layout(text);
        let (origin_x, baseline) = centered_origin(width, height, layout.width, layout.height);

        debug!("Rendering {:?}: {}x{} text at ({}, {})",
               text, layout.width, layout.height, origin_x, baseline);

        for glyph in &layout.glyphs {
            if glyph.metrics.width == 0 || glyph.metrics.height == 0 {
                continue;
            }

            let (metrics, coverage) = self.font.rasterize(glyph.ch, self.font_size);
            let left = origin_x + glyph.pen_x.round() as i64 + metrics.xmin as i64;
            let top = baseline - (metrics.height as i64 + metrics.ymin as i64);

            for row in 0..metrics.height {
                let y = top + row as i64;
                if y < 0 || y >= height as i64 {
                    continue;
                }
                for col in 0..metrics.width {
                    let x = left + col as i64;
                    if x < 0 || x >= width as i64 {
                        continue;
                    }
                    let alpha = coverage[row * metrics.width + col];
                    if alpha == 0 {
                        continue;
                    }
                    let (x, y) = (x as u32, y as u32);
                    let base = frame.get_pixel(x, y);
                    frame.set_pixel(x, y, blend(base, self.foreground, alpha));
                }
            }
        }

        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn system_renderer() -> Option<FontRenderer> {
        let path = FontRenderer::find_system_font()?;
        FontRenderer::from_file(path, 32.0, [255, 255, 255]).ok()
    }

    #[test]
    fn test_missing_font_is_render_unavailable() {
        let config = InterstitialConfig {
            font_path: Some(PathBuf::from("/no/such/font.ttf")),
            ..InterstitialConfig::default()
        };
        let err = FontRenderer::new(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RenderUnavailable);
    }

    #[test]
    fn test_garbage_font_data_is_render_unavailable() {
        let err = FontRenderer::from_bytes(vec![0u8; 16], 32.0, [255, 255, 255]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RenderUnavailable);
    }

    #[test]
    fn test_render_fills_background_and_draws_text() {
        // Hosts without any of the known fonts have nothing to draw with
        let Some(renderer) = system_renderer() else { return };

        let frame = renderer.render("Hello", 320, 120, [0, 0, 128]).unwrap();
        assert_eq!((frame.width(), frame.height()), (320, 120));
        assert_eq!(frame.get_pixel(0, 0), [0, 0, 128]);
        assert_eq!(frame.get_pixel(319, 119), [0, 0, 128]);

        let lit = frame.as_image().pixels().filter(|p| p.0[0] > 200).count();
        assert!(lit > 0, "expected some white text pixels");
    }

    #[test]
    fn test_text_is_horizontally_centered() {
        let Some(renderer) = system_renderer() else { return };

        let frame = renderer.render("IIII", 400, 100, [0, 0, 0]).unwrap();
        let columns: Vec<u32> = (0..400)
            .filter(|&x| (0..100).any(|y| frame.get_pixel(x, y)[0] > 0))
            .collect();
        let (first, last) = (columns[0], *columns.last().unwrap());
        let left_margin = first as i64;
        let right_margin = 399 - last as i64;
        assert!((left_margin - right_margin).abs() <= 8);
    }

    #[test]
    fn test_oversized_text_does_not_panic() {
        let Some(renderer) = system_renderer() else { return };

        let text = "This message is far too long to fit inside a tiny frame";
        let frame = renderer.render(text, 40, 20, [10, 10, 10]).unwrap();
        assert_eq!((frame.width(), frame.height()), (40, 20));
    }
}
