//! # Video I/O Module
//!
//! Frame types, the source/sink traits the interleaver works against, and two
//! backends: ffmpeg subprocesses for real files and in-memory buffers.

pub mod types;
pub mod io;
pub mod ffmpeg;
pub mod memory;

pub use types::{Frame, FrameRate, StreamDescriptor};
pub use io::{FrameSink, FrameSource};
pub use ffmpeg::{FfmpegSink, FfmpegSource, FfmpegVideoIo, ProbeInfo};
pub use memory::{MemorySink, MemorySource};
