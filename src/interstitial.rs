//! # Interstitial Generator
//!
//! Repeats one rendered text card for a fixed on-screen duration. Frames are
//! produced on demand, so long cards never sit in memory as a frame list.

use std::iter::FusedIterator;

use crate::video::types::{Frame, FrameRate};

/// Number of frames that fill `duration_secs` at `frame_rate`, rounded down
///
/// Zero, negative or non-finite durations give zero frames.
pub fn frame_count(duration_secs: f64, frame_rate: FrameRate) -> usize {
    let exact = duration_secs * f64::from(frame_rate.num) / f64::from(frame_rate.den);
    // Decimal durations like 0.29s land a hair below the whole frame count
    let nearest = exact.round();
    let frames = if (exact - nearest).abs() < 1e-9 { nearest } else { exact.floor() };
    if frames.is_finite() && frames > 0.0 {
        frames as usize
    } else {
        0
    }
}

/// A burst of identical frames showing one card
#[derive(Debug, Clone)]
pub struct Interstitial {
    frame: Frame,
    remaining: usize,
}

impl Interstitial {
    pub fn new(frame: Frame, duration_secs: f64, frame_rate: FrameRate) -> Self {
        Self {
            frame,
            remaining: frame_count(duration_secs, frame_rate),
        }
    }
}

impl Iterator for Interstitial {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.frame.clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Interstitial {}

impl FusedIterator for Interstitial {}
