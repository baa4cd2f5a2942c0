use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AnnotationError;

/// A message to show at a point in the source video's timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    timestamp: f64,
    text: String,
}

impl Annotation {
    /// Create an annotation; the timestamp must be finite and non-negative and
    /// the text must contain something other than whitespace
    pub fn new<S: Into<String>>(timestamp: f64, text: S) -> Result<Self, AnnotationError> {
        let text = text.into();

        if !timestamp.is_finite() || timestamp < 0.0 {
            return Err(AnnotationError::Invalid {
                details: format!("timestamp {} is not a non-negative number of seconds", timestamp),
            });
        }

        if text.trim().is_empty() {
            return Err(AnnotationError::Invalid {
                details: "annotation text is empty".to_string(),
            });
        }

        Ok(Self { timestamp, text })
    }

    /// Seconds from the start of the source video
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.timestamp.floor() as u64;
        write!(f, "{:02}:{:02} {}", whole / 60, whole % 60, self.text)
    }
}

/// Stable ascending sort by timestamp; equal timestamps keep their input order
pub fn sort_annotations(annotations: &mut [Annotation]) {
    annotations.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_annotations() {
        assert!(Annotation::new(-1.0, "x").is_err());
        assert!(Annotation::new(f64::NAN, "x").is_err());
        assert!(Annotation::new(1.0, "   ").is_err());
        assert!(Annotation::new(0.0, "ok").is_ok());
    }

    #[test]
    fn test_sort_is_stable() {
        let mut annotations = vec![
            Annotation::new(5.0, "late").unwrap(),
            Annotation::new(2.0, "A").unwrap(),
            Annotation::new(1.0, "early").unwrap(),
            Annotation::new(2.0, "B").unwrap(),
        ];
        sort_annotations(&mut annotations);

        let texts: Vec<&str> = annotations.iter().map(|a| a.text()).collect();
        assert_eq!(texts, vec!["early", "A", "B", "late"]);
    }

    #[test]
    fn test_display_uses_minutes_and_seconds() {
        let annotation = Annotation::new(125.0, "Chapter two").unwrap();
        assert_eq!(annotation.to_string(), "02:05 Chapter two");
    }
}
