use thiserror::Error;

/// Main error type for the Interstitial-Compositor library
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Rendering error: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Annotation file errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotationError {
    #[error("Failed to read annotation file: {path} ({reason})")]
    SourceUnavailable { path: String, reason: String },

    #[error("Line {line}: expected `MM:SS message`, got {content:?}")]
    MalformedLine { line: usize, content: String },

    #[error("Line {line}: malformed timestamp {value:?}")]
    MalformedTimestamp { line: usize, value: String },

    #[error("Invalid annotation: {details}")]
    Invalid { details: String },

    #[error("No valid annotations found in {path}")]
    EmptyAnnotationSet { path: String },
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Cannot open source video {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    #[error("Cannot create destination video {path}: {reason}")]
    DestinationUnavailable { path: String, reason: String },

    #[error("Unsupported video format: {format}")]
    UnsupportedFormat { format: String },

    #[error("I/O failure at source frame {frame_index}: {reason}")]
    MidStream { frame_index: u64, reason: String },

    #[error("Processing cancelled at source frame {frame_index}")]
    Cancelled { frame_index: u64 },
}

/// Text rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No font backend available: {reason}")]
    Unavailable { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Flat classification of every failure the pipeline can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SourceUnavailable,
    DestinationUnavailable,
    UnsupportedFormat,
    RenderUnavailable,
    MalformedTimestamp,
    EmptyAnnotationSet,
    MidStreamIoError,
    Cancelled,
    Config,
    Other,
}

/// Convenience type alias for Results using CompositorError
pub type Result<T> = std::result::Result<T, CompositorError>;

impl CompositorError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Annotation(AnnotationError::SourceUnavailable { .. }) => ErrorKind::SourceUnavailable,
            Self::Annotation(AnnotationError::MalformedTimestamp { .. }) => ErrorKind::MalformedTimestamp,
            Self::Annotation(AnnotationError::EmptyAnnotationSet { .. }) => ErrorKind::EmptyAnnotationSet,
            Self::Annotation(_) => ErrorKind::Other,
            Self::Video(VideoError::SourceUnavailable { .. }) => ErrorKind::SourceUnavailable,
            Self::Video(VideoError::DestinationUnavailable { .. }) => ErrorKind::DestinationUnavailable,
            Self::Video(VideoError::UnsupportedFormat { .. }) => ErrorKind::UnsupportedFormat,
            Self::Video(VideoError::MidStream { .. }) => ErrorKind::MidStreamIoError,
            Self::Video(VideoError::Cancelled { .. }) => ErrorKind::Cancelled,
            Self::Render(RenderError::Unavailable { .. }) => ErrorKind::RenderUnavailable,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Other,
        }
    }

    /// Whether the output file may have been left partially written
    pub fn leaves_partial_output(&self) -> bool {
        matches!(
            self,
            Self::Video(VideoError::MidStream { .. }) | Self::Video(VideoError::Cancelled { .. })
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Annotation(AnnotationError::SourceUnavailable { path, .. }) => {
                format!("Could not read annotation file '{}'. Please check the file exists.", path)
            }
            Self::Annotation(AnnotationError::EmptyAnnotationSet { path }) => {
                format!("No valid entries in '{}'. Expected lines like '01:30 Chapter two'.", path)
            }
            Self::Video(VideoError::SourceUnavailable { path, .. }) => {
                format!("Could not open video file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Video(VideoError::DestinationUnavailable { path, .. }) => {
                format!("Could not write output video '{}'. Please check the directory is writable.", path)
            }
            Self::Video(VideoError::MidStream { .. }) => {
                format!("{}. The output file is incomplete.", self)
            }
            Self::Render(RenderError::Unavailable { .. }) => {
                "No usable font found. Set `interstitial.font_path` in the configuration.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
