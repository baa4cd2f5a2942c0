use std::path::Path;

use tracing::{debug, info, warn};

use crate::annotations::types::Annotation;
use crate::error::{AnnotationError, Result};

/// Reads `MM:SS message` annotation files
///
/// Lines that cannot be parsed are logged and skipped; they never abort the
/// file. Results are returned in file order, unsorted.
pub struct AnnotationParser;

impl AnnotationParser {
    /// Load and parse an annotation file
    ///
    /// A missing or unreadable file is an error; a readable file with no valid
    /// lines yields an empty list.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Annotation>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AnnotationError::SourceUnavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let annotations = Self::parse_str(&content);
        info!("Loaded {} annotations from {:?}", annotations.len(), path);
        Ok(annotations)
    }

    /// Parse every line of `content`, skipping the ones that are malformed
    pub fn parse_str(content: &str) -> Vec<Annotation> {
        let mut annotations = Vec::new();

        for (index, line) in content.lines().enumerate() {
            let line_number = index + 1;
            if line.trim().is_empty() {
                continue;
            }

            match Self::parse_line(line_number, line) {
                Ok(annotation) => {
                    debug!("Line {}: {:.0}s {:?}", line_number, annotation.timestamp(), annotation.text());
                    annotations.push(annotation);
                }
                Err(e) => warn!("Skipping annotation: {}", e),
            }
        }

        annotations
    }

    /// Parse a single `MM:SS message text` line
    ///
    /// Only the first whitespace run separates the time from the message, so
    /// the message keeps its inner spacing.
    pub fn parse_line(line_number: usize, line: &str) -> std::result::Result<Annotation, AnnotationError> {
        let line = line.trim();
        let malformed = || AnnotationError::MalformedLine {
            line: line_number,
            content: line.to_string(),
        };

        let (time, message) = line.split_once(char::is_whitespace).ok_or_else(malformed)?;
        let message = message.trim_start();
        if time.is_empty() || message.is_empty() {
            return Err(malformed());
        }

        let timestamp = Self::parse_timestamp(time).ok_or_else(|| AnnotationError::MalformedTimestamp {
            line: line_number,
            value: time.to_string(),
        })?;

        Annotation::new(timestamp as f64, message)
    }

    /// `MM:SS` to whole seconds. Seconds are not clock-wrapped: `01:75` is 135.
    pub fn parse_timestamp(value: &str) -> Option<u64> {
        let (minutes, seconds) = value.split_once(':')?;
        let minutes: u64 = minutes.parse().ok()?;
        let seconds: u64 = seconds.parse().ok()?;
        minutes.checked_mul(60)?.checked_add(seconds)
    }
}
