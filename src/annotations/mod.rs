//! # Annotation Module
//!
//! Parses the plain-text annotation format, one entry per line:
//!
//! ```text
//! 00:03 Hello
//! 01:30 Chapter two begins
//! ```
//!
//! Malformed lines are skipped with a warning rather than failing the file.

pub mod parser;
pub mod types;

pub use parser::AnnotationParser;
pub use types::{sort_annotations, Annotation};
