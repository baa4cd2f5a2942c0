use std::fmt;

use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Represents a single video frame
///
/// A thin wrapper around an RGB image buffer. Frames are produced once (by a
/// decoder or the text renderer) and moved into the sink that writes them.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb(color));
        Self { buffer }
    }

    /// Get the width of the frame
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Get the height of the frame
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Set a pixel at the given coordinates
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Borrow the raw packed RGB24 bytes
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Create a frame from raw RGB bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save(path)
    }

    /// Whether this frame has the dimensions announced by `descriptor`
    pub fn matches(&self, descriptor: &StreamDescriptor) -> bool {
        self.width() == descriptor.width && self.height() == descriptor.height
    }
}

/// Exact frame rate as a rational number of frames per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    /// Create a frame rate; `None` when either term is zero
    pub fn new(num: u32, den: u32) -> Option<Self> {
        if num == 0 || den == 0 {
            return None;
        }
        Some(Self { num, den })
    }

    /// Whole-number frame rate
    pub fn from_integer(fps: u32) -> Option<Self> {
        Self::new(fps, 1)
    }

    /// Parse ffprobe notation such as `"30000/1001"` or `"25"`
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.split_once('/') {
            Some((num, den)) => Self::new(num.trim().parse().ok()?, den.trim().parse().ok()?),
            None => Self::from_integer(value.parse().ok()?),
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Playback time of the frame at `index`, in seconds
    pub fn time_of_frame(&self, index: u64) -> f64 {
        (index as f64 * self.den as f64) / self.num as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Stream parameters shared by the source, the text cards and the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub frame_rate: FrameRate,
    pub width: u32,
    pub height: u32,
}

impl StreamDescriptor {
    pub fn new(frame_rate: FrameRate, width: u32, height: u32) -> Self {
        Self { frame_rate, width, height }
    }

    /// Size in bytes of one packed RGB24 frame
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Duration in seconds of `frames` frames at this stream's rate
    pub fn duration_of(&self, frames: u64) -> f64 {
        self.frame_rate.time_of_frame(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rate_parsing() {
        assert_eq!(FrameRate::parse("30000/1001"), FrameRate::new(30000, 1001));
        assert_eq!(FrameRate::parse("25"), FrameRate::from_integer(25));
        assert_eq!(FrameRate::parse("0/0"), None);
        assert_eq!(FrameRate::parse("abc"), None);
    }

    #[test]
    fn test_time_of_frame_keeps_fractional_rates() {
        let ntsc = FrameRate::new(30000, 1001).unwrap();
        // 30 frames at 29.97 fps is slightly over one second
        assert!(ntsc.time_of_frame(30) > 1.0);

        let two = FrameRate::from_integer(2).unwrap();
        assert_eq!(two.time_of_frame(6), 3.0);
        assert_eq!(two.to_string(), "2");
        assert_eq!(ntsc.to_string(), "30000/1001");
    }

    #[test]
    fn test_frame_bytes_roundtrip_dimensions() {
        let frame = Frame::new_filled(4, 2, [10, 20, 30]);
        assert_eq!(frame.as_rgb_bytes().len(), 4 * 2 * 3);
        let descriptor = StreamDescriptor::new(FrameRate::from_integer(24).unwrap(), 4, 2);
        assert_eq!(descriptor.frame_len(), 24);
        assert!(frame.matches(&descriptor));
        assert!(Frame::from_rgb_bytes(4, 2, vec![0; 5]).is_none());
    }
}
