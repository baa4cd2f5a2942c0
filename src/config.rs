use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for the Interstitial-Compositor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text card settings
    pub interstitial: InterstitialConfig,

    /// Video decode/encode settings
    pub video: VideoConfig,

    /// Pipeline behaviour
    pub processing: ProcessingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.interstitial.validate()?;
        self.video.validate()?;
        Ok(())
    }
}

/// Text card configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterstitialConfig {
    /// How long each card stays on screen (seconds)
    pub duration_secs: f64,

    /// Glyph size in pixels
    pub font_size: f32,

    /// Text color
    pub foreground: [u8; 3],

    /// TrueType/OpenType font file; system fonts are searched when unset
    pub font_path: Option<PathBuf>,
}

impl Default for InterstitialConfig {
    fn default() -> Self {
        Self {
            duration_secs: 5.0,
            font_size: 64.0,
            foreground: [255, 255, 255],
            font_path: None,
        }
    }
}

impl InterstitialConfig {
    fn validate(&self) -> Result<()> {
        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "interstitial.duration_secs".to_string(),
                value: self.duration_secs.to_string()
            }.into());
        }

        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "interstitial.font_size".to_string(),
                value: self.font_size.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Video decode/encode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// ffmpeg executable
    pub ffmpeg_path: PathBuf,

    /// ffprobe executable
    pub ffprobe_path: PathBuf,

    /// Output codec passed to `-c:v`
    pub codec: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            // Same family as OpenCV's `mp4v` fourcc
            codec: "mpeg4".to_string(),
            quality: 85,
        }
    }
}

impl VideoConfig {
    fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "video.quality".to_string(),
                value: self.quality.to_string()
            }.into());
        }

        if self.codec.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "video.codec".to_string(),
                value: self.codec.clone()
            }.into());
        }

        Ok(())
    }

    /// Map quality (0-100) onto ffmpeg's `-q:v` scale (31 worst, 1 best)
    pub fn qscale(&self) -> u8 {
        let quality = self.quality.min(100) as f32 / 100.0;
        (31.0 - quality * 30.0).round().clamp(1.0, 31.0) as u8
    }
}

/// What to do when the annotation file yields no usable entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyAnnotationPolicy {
    /// Fail with `EmptyAnnotationSet` before the video is opened
    #[default]
    Reject,
    /// Copy the source through unchanged
    PassThrough,
}

/// Pipeline behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub empty_annotations: EmptyAnnotationPolicy,
}
