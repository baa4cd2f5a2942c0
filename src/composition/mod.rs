//! # Composition Engine
//!
//! The interleaver that splices text cards into the source frame stream, and
//! the engine that wires annotation loading, video I/O and rendering around it.

pub mod engine;
pub mod interleaver;

// Re-exports for convenience
pub use engine::CompositionEngine;
pub use interleaver::{InterleaveCursor, InterleaveReport, InterleaveState, Interleaver};
