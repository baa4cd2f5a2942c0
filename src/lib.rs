//! # Interstitial-Compositor
//!
//! Splice timed full-frame text cards into an existing video.
//!
//! Given a video and a list of `(timestamp, message)` annotations, the library
//! produces a new video in which, at each annotation's timestamp, a solid-color
//! card bearing the message is shown for a fixed duration before the original
//! footage resumes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use interstitial_compositor::{composition::CompositionEngine, config::Config};
//!
//! # fn main() -> anyhow::Result<()> {
//! let engine = CompositionEngine::with_font_renderer(Config::default())?;
//! let report = engine.process(
//!     "talk.mp4",
//!     "chapters.txt",
//!     "talk_with_cards.mp4",
//!     [20, 20, 60],
//! )?;
//! println!("{} cards inserted", report.fired_annotations);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`annotations`] - Parsing of `MM:SS message` files
//! - [`render`] - Text card rendering
//! - [`interstitial`] - Repeating one card for its on-screen duration
//! - [`composition`] - The interleaver and the engine around it
//! - [`video`] - Frame types and video sources/sinks
//! - [`config`] - Configuration management
//!
//! ## Custom Backends
//!
//! The interleaver only sees the [`FrameSource`](video::FrameSource),
//! [`FrameSink`](video::FrameSink) and [`TextRenderer`](render::TextRenderer)
//! traits, so any decoder, encoder or text engine can be plugged in:
//!
//! ```rust,no_run
//! use interstitial_compositor::render::TextRenderer;
//! use interstitial_compositor::video::Frame;
//! use interstitial_compositor::Result;
//!
//! struct BlankCards;
//!
//! impl TextRenderer for BlankCards {
//!     fn name(&self) -> &str {
//!         "blank"
//!     }
//!
//!     fn render(&self, _text: &str, width: u32, height: u32, background: [u8; 3]) -> Result<Frame> {
//!         Ok(Frame::new_filled(width, height, background))
//!     }
//! }
//! ```

pub mod annotations;
pub mod composition;
pub mod config;
pub mod error;
pub mod interstitial;
pub mod render;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    annotations::{Annotation, AnnotationParser},
    composition::{CompositionEngine, InterleaveReport},
    config::Config,
    error::{CompositorError, ErrorKind, Result},
    render::TextRenderer,
};
