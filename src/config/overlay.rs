// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{VisualizationStyle, read_json, validate_resize_factor, validate_threshold};
use crate::error::{PoseError, Result};
use crate::filter::DEFAULT_CONFIDENCE_THRESHOLD;

/// Output video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// H.264 in YUV 4:2:0.
    #[default]
    H264,
}

impl VideoCodec {
    /// Get string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::H264 => "h264",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoCodec {
    type Err = PoseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "h264" | "avc1" | "x264" => Ok(Self::H264),
            _ => Err(PoseError::ConfigError(format!(
                "Unsupported codec '{s}'. Supported: h264"
            ))),
        }
    }
}

/// Plain overlay video settings, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// Output codec name.
    pub codec: String,
    /// Output frame rate; the source frame rate when unset.
    pub fps: Option<f32>,
    /// Scale applied to every output frame.
    pub resize_factor: Option<f32>,
    /// Drawing style.
    pub style: VisualizationStyle,
    /// Joints below this confidence are not drawn.
    pub confidence_threshold: f32,
    /// Frames between progress callbacks.
    pub progress_interval: usize,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264.as_str().to_string(),
            fps: None,
            resize_factor: None,
            style: VisualizationStyle::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            progress_interval: 10,
        }
    }
}

impl OverlaySettings {
    /// Create default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a JSON file. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Set the codec.
    #[must_use]
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Override the output frame rate.
    #[must_use]
    pub const fn with_fps(mut self, fps: f32) -> Self {
        self.fps = Some(fps);
        self
    }

    /// Scale output frames.
    #[must_use]
    pub const fn with_resize_factor(mut self, factor: f32) -> Self {
        self.resize_factor = Some(factor);
        self
    }

    /// Set the drawing style.
    #[must_use]
    pub fn with_style(mut self, style: VisualizationStyle) -> Self {
        self.style = style;
        self
    }

    /// Set the drawing confidence threshold.
    #[must_use]
    pub const fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the progress callback interval.
    #[must_use]
    pub const fn with_progress_interval(mut self, frames: usize) -> Self {
        self.progress_interval = frames;
        self
    }

    /// Validate and freeze the settings.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] for any invalid value.
    pub fn build(self) -> Result<OverlayConfig> {
        OverlayConfig::new(self)
    }
}

/// Validated, immutable overlay video configuration.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    settings: OverlaySettings,
    codec: VideoCodec,
}

impl OverlayConfig {
    /// Validate settings.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] for an unsupported codec, a non-positive fps or resize
    /// factor, a threshold outside `[0, 1]`, a zero progress interval or an invalid style.
    pub fn new(settings: OverlaySettings) -> Result<Self> {
        let codec: VideoCodec = settings.codec.parse()?;
        if let Some(fps) = settings.fps
            && (!fps.is_finite() || fps <= 0.0)
        {
            return Err(PoseError::ConfigError(format!(
                "fps must be positive, got {fps}"
            )));
        }
        validate_resize_factor("resize_factor", settings.resize_factor)?;
        validate_threshold("confidence_threshold", settings.confidence_threshold)?;
        if settings.progress_interval == 0 {
            return Err(PoseError::ConfigError(
                "progress_interval must be at least 1".to_string(),
            ));
        }
        settings.style.validate()?;

        Ok(Self { settings, codec })
    }

    /// Load and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] if the file is unreadable or invalid.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        OverlaySettings::from_json_file(path)?.build()
    }

    /// The settings this config was built from.
    #[must_use]
    pub const fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    /// Output codec.
    #[must_use]
    pub const fn codec(&self) -> VideoCodec {
        self.codec
    }

    /// Output fps override.
    #[must_use]
    pub const fn fps(&self) -> Option<f32> {
        self.settings.fps
    }

    /// Output resize factor.
    #[must_use]
    pub const fn resize_factor(&self) -> Option<f32> {
        self.settings.resize_factor
    }

    /// Drawing style.
    #[must_use]
    pub const fn style(&self) -> &VisualizationStyle {
        &self.settings.style
    }

    /// Drawing confidence threshold.
    #[must_use]
    pub const fn confidence_threshold(&self) -> f32 {
        self.settings.confidence_threshold
    }

    /// Frames between progress callbacks.
    #[must_use]
    pub const fn progress_interval(&self) -> usize {
        self.settings.progress_interval
    }
}

impl TryFrom<OverlaySettings> for OverlayConfig {
    type Error = PoseError;

    fn try_from(settings: OverlaySettings) -> Result<Self> {
        Self::new(settings)
    }
}
