// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::template::{NameTemplate, Placeholder};
use super::{ImageFormat, VisualizationStyle, read_json, validate_resize_factor, validate_threshold};
use crate::error::{PoseError, Result};
use crate::filter::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MIN_VALID_JOINTS};

/// Settings of one extracted image stream (raw or overlay).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Produce this stream.
    pub enabled: bool,
    /// `jpg`, `jpeg`, `png` or `bmp`.
    pub image_format: String,
    /// Encoding quality in `[0, 100]`.
    pub quality: u32,
    /// Scale applied before writing.
    pub resize_factor: Option<f32>,
    /// Only write frames that contain a valid pose.
    pub valid_frames_only: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            image_format: "jpg".to_string(),
            quality: 95,
            resize_factor: None,
            valid_frames_only: false,
        }
    }
}

impl StreamSettings {
    /// Create default stream settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disabled stream.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the image format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.image_format = format.into();
        self
    }

    /// Set the encoding quality.
    #[must_use]
    pub const fn with_quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }

    /// Set the resize factor.
    #[must_use]
    pub const fn with_resize_factor(mut self, factor: f32) -> Self {
        self.resize_factor = Some(factor);
        self
    }

    /// Restrict the stream to frames with valid poses.
    #[must_use]
    pub const fn with_valid_frames_only(mut self, enabled: bool) -> Self {
        self.valid_frames_only = enabled;
        self
    }

    fn build(&self, stream: &str) -> Result<StreamConfig> {
        let format: ImageFormat = self.image_format.parse()?;
        let quality = u8::try_from(self.quality)
            .ok()
            .filter(|q| *q <= 100)
            .ok_or_else(|| {
                PoseError::ConfigError(format!(
                    "{stream} image quality must be within [0, 100], got {}",
                    self.quality
                ))
            })?;
        validate_resize_factor(&format!("{stream} resize_factor"), self.resize_factor)?;

        Ok(StreamConfig {
            enabled: self.enabled,
            format,
            quality,
            resize_factor: self.resize_factor,
            valid_frames_only: self.valid_frames_only,
        })
    }
}

/// Validated settings of one image stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConfig {
    /// Produce this stream.
    pub enabled: bool,
    /// Output image format.
    pub format: ImageFormat,
    /// Encoding quality in `[0, 100]`.
    pub quality: u8,
    /// Scale applied before writing.
    pub resize_factor: Option<f32>,
    /// Only write frames that contain a valid pose.
    pub valid_frames_only: bool,
}

/// Plain frame extraction settings, loadable from JSON.
///
/// Call [`build`](Self::build) to obtain a validated [`FrameExtractionConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameExtractionSettings {
    /// Parent of the generated directories.
    pub base_output_directory: PathBuf,
    /// Directory name template over `{type}`, `{video_name}` and `{timestamp}`.
    pub directory_name_template: String,
    /// Frame file template over `{index}` and `{extension}`.
    pub frame_filename_template: String,
    /// `{type}` value of the raw stream directory.
    pub raw_directory_type: String,
    /// `{type}` value of the overlay stream directory.
    pub overlay_directory_type: String,
    /// `chrono` format of the `{timestamp}` value.
    pub timestamp_format: String,
    /// Raw frame stream.
    pub raw: StreamSettings,
    /// Overlay frame stream.
    pub overlay: StreamSettings,
    /// Overlay drawing style.
    pub style: VisualizationStyle,
    /// Joint confidence threshold for validity and drawing.
    pub confidence_threshold: f32,
    /// Confident joints needed for a valid pose.
    pub min_valid_joints: usize,
    /// Half-open `[start, end)` frame range.
    pub frame_range: Option<(usize, usize)>,
    /// Keep frames whose index is a multiple of this stride.
    pub frame_skip: usize,
}

impl Default for FrameExtractionSettings {
    fn default() -> Self {
        Self {
            base_output_directory: PathBuf::from("outputs"),
            directory_name_template: "{type}_{video_name}_{timestamp}".to_string(),
            frame_filename_template: "frame_{index:05}.{extension}".to_string(),
            raw_directory_type: "frames".to_string(),
            overlay_directory_type: "overlay".to_string(),
            timestamp_format: "%Y%m%d_%H%M%S".to_string(),
            raw: StreamSettings::default(),
            overlay: StreamSettings::default(),
            style: VisualizationStyle::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            min_valid_joints: DEFAULT_MIN_VALID_JOINTS,
            frame_range: None,
            frame_skip: 1,
        }
    }
}

impl FrameExtractionSettings {
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

    /// Set the base output directory.
    #[must_use]
    pub fn with_base_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_output_directory = dir.into();
        self
    }

    /// Set the directory name template.
    #[must_use]
    pub fn with_directory_name_template(mut self, template: impl Into<String>) -> Self {
        self.directory_name_template = template.into();
        self
    }

    /// Set the frame file name template.
    #[must_use]
    pub fn with_frame_filename_template(mut self, template: impl Into<String>) -> Self {
        self.frame_filename_template = template.into();
        self
    }

    /// Set raw stream settings.
    #[must_use]
    pub fn with_raw(mut self, raw: StreamSettings) -> Self {
        self.raw = raw;
        self
    }

    /// Set overlay stream settings.
    #[must_use]
    pub fn with_overlay(mut self, overlay: StreamSettings) -> Self {
        self.overlay = overlay;
        self
    }

    /// Set the raw stream quality.
    #[must_use]
    pub const fn with_raw_quality(mut self, quality: u32) -> Self {
        self.raw.quality = quality;
        self
    }

    /// Set the drawing style.
    #[must_use]
    pub fn with_style(mut self, style: VisualizationStyle) -> Self {
        self.style = style;
        self
    }

    /// Set the joint confidence threshold.
    #[must_use]
    pub const fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the confident joints needed for a valid pose.
    #[must_use]
    pub const fn with_min_valid_joints(mut self, count: usize) -> Self {
        self.min_valid_joints = count;
        self
    }

    /// Restrict extraction to `[start, end)`.
    #[must_use]
    pub const fn with_frame_range(mut self, start: usize, end: usize) -> Self {
        self.frame_range = Some((start, end));
        self
    }

    /// Set the frame stride.
    #[must_use]
    pub const fn with_frame_skip(mut self, skip: usize) -> Self {
        self.frame_skip = skip;
        self
    }

    /// Validate and freeze the settings.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] for any invalid value.
    pub fn build(self) -> Result<FrameExtractionConfig> {
        FrameExtractionConfig::new(self)
    }
}

/// Validated, immutable frame extraction configuration.
#[derive(Debug, Clone)]
pub struct FrameExtractionConfig {
    settings: FrameExtractionSettings,
    raw: StreamConfig,
    overlay: StreamConfig,
    directory_template: NameTemplate,
    filename_template: NameTemplate,
}

impl FrameExtractionConfig {
    /// Validate settings.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] for quality outside `[0, 100]`, unsupported image
    /// formats, an empty or reversed frame range, a zero frame skip, a threshold outside
    /// `[0, 1]`, invalid templates, an invalid timestamp format or an invalid style.
    pub fn new(settings: FrameExtractionSettings) -> Result<Self> {
        let raw = settings.raw.build("raw")?;
        let overlay = settings.overlay.build("overlay")?;

        validate_threshold("confidence_threshold", settings.confidence_threshold)?;
        settings.style.validate()?;

        if let Some((start, end)) = settings.frame_range
            && start >= end
        {
            return Err(PoseError::ConfigError(format!(
                "frame_range start ({start}) must be less than end ({end})"
            )));
        }
        if settings.frame_skip < 1 {
            return Err(PoseError::ConfigError(
                "frame_skip must be at least 1".to_string(),
            ));
        }

        let directory_template = NameTemplate::parse(
            &settings.directory_name_template,
            &[
                Placeholder::Type,
                Placeholder::VideoName,
                Placeholder::Timestamp,
            ],
        )?;
        let filename_template = NameTemplate::parse(
            &settings.frame_filename_template,
            &[Placeholder::Index, Placeholder::Extension],
        )?;
        if !filename_template.contains(Placeholder::Index) {
            return Err(PoseError::ConfigError(format!(
                "frame_filename_template '{}' must contain {{index}}",
                settings.frame_filename_template
            )));
        }
        if settings.raw_directory_type.is_empty() || settings.overlay_directory_type.is_empty() {
            return Err(PoseError::ConfigError(
                "directory types must not be empty".to_string(),
            ));
        }
        if chrono::format::StrftimeItems::new(&settings.timestamp_format)
            .any(|item| matches!(item, chrono::format::Item::Error))
        {
            return Err(PoseError::ConfigError(format!(
                "Invalid timestamp_format '{}'",
                settings.timestamp_format
            )));
        }

        Ok(Self {
            settings,
            raw,
            overlay,
            directory_template,
            filename_template,
        })
    }

    /// Load and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] if the file is unreadable or invalid.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        FrameExtractionSettings::from_json_file(path)?.build()
    }

    /// The settings this config was built from.
    #[must_use]
    pub const fn settings(&self) -> &FrameExtractionSettings {
        &self.settings
    }

    /// Raw stream configuration.
    #[must_use]
    pub const fn raw(&self) -> &StreamConfig {
        &self.raw
    }

    /// Overlay stream configuration.
    #[must_use]
    pub const fn overlay(&self) -> &StreamConfig {
        &self.overlay
    }

    /// Directory name template.
    #[must_use]
    pub const fn directory_template(&self) -> &NameTemplate {
        &self.directory_template
    }

    /// Frame file name template.
    #[must_use]
    pub const fn filename_template(&self) -> &NameTemplate {
        &self.filename_template
    }

    /// Base output directory.
    #[must_use]
    pub fn base_output_directory(&self) -> &Path {
        &self.settings.base_output_directory
    }

    /// Drawing style.
    #[must_use]
    pub const fn style(&self) -> &VisualizationStyle {
        &self.settings.style
    }

    /// Joint confidence threshold.
    #[must_use]
    pub const fn confidence_threshold(&self) -> f32 {
        self.settings.confidence_threshold
    }

    /// Confident joints needed for a valid pose.
    #[must_use]
    pub const fn min_valid_joints(&self) -> usize {
        self.settings.min_valid_joints
    }

    /// Half-open frame range.
    #[must_use]
    pub const fn frame_range(&self) -> Option<(usize, usize)> {
        self.settings.frame_range
    }

    /// Frame stride.
    #[must_use]
    pub const fn frame_skip(&self) -> usize {
        self.settings.frame_skip
    }

    /// Format a timestamp for directory names.
    #[must_use]
    pub fn format_timestamp<Tz>(&self, time: &chrono::DateTime<Tz>) -> String
    where
        Tz: chrono::TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        time.format(&self.settings.timestamp_format).to_string()
    }

    /// Copy of this config with a different base directory.
    #[must_use]
    pub fn with_base_output_directory(&self, dir: impl Into<PathBuf>) -> Self {
        let mut config = self.clone();
        config.settings.base_output_directory = dir.into();
        config
    }
}

impl TryFrom<FrameExtractionSettings> for FrameExtractionConfig {
    type Error = PoseError;

    fn try_from(settings: FrameExtractionSettings) -> Result<Self> {
        Self::new(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build() {
        let config = FrameExtractionSettings::default().build().unwrap();
        assert_eq!(config.raw().format, ImageFormat::Jpeg);
        assert_eq!(config.raw().quality, 95);
        assert_eq!(config.frame_skip(), 1);
        assert!(config.frame_range().is_none());
        assert!((config.confidence_threshold() - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.base_output_directory(), Path::new("outputs"));
    }

    #[test]
    fn test_quality_out_of_range() {
        let err = FrameExtractionSettings::new()
            .with_raw_quality(150)
            .build()
            .unwrap_err();
        assert!(matches!(err, PoseError::ConfigError(_)));

        let err = FrameExtractionSettings::new()
            .with_overlay(StreamSettings::new().with_quality(101))
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn test_invalid_values() {
        let bad = [
            FrameExtractionSettings::new().with_raw(StreamSettings::new().with_format("gif")),
            FrameExtractionSettings::new().with_frame_range(10, 10),
            FrameExtractionSettings::new().with_frame_range(10, 5),
            FrameExtractionSettings::new().with_frame_skip(0),
            FrameExtractionSettings::new().with_confidence_threshold(1.5),
            FrameExtractionSettings::new().with_frame_filename_template("frame.{extension}"),
            FrameExtractionSettings::new().with_directory_name_template("{index}"),
            FrameExtractionSettings::new()
                .with_raw(StreamSettings::new().with_resize_factor(-0.5)),
        ];
        for settings in bad {
            assert!(
                matches!(settings.clone().build(), Err(PoseError::ConfigError(_))),
                "{settings:?}"
            );
        }
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extract.json");
        std::fs::write(
            &path,
            r#"{"raw": {"image_format": "png", "quality": 80}, "frame_skip": 3, "frame_range": [0, 20]}"#,
        )
        .unwrap();
        let config = FrameExtractionConfig::from_json_file(&path).unwrap();
        assert_eq!(config.raw().format, ImageFormat::Png);
        assert_eq!(config.raw().quality, 80);
        assert_eq!(config.frame_skip(), 3);
        assert_eq!(config.frame_range(), Some((0, 20)));
        assert_eq!(config.overlay().format, ImageFormat::Jpeg);

        std::fs::write(&path, r#"{"frame_skip": -1}"#).unwrap();
        assert!(matches!(
            FrameExtractionConfig::from_json_file(&path),
            Err(PoseError::ConfigError(_))
        ));
    }

    #[test]
    fn test_timestamp_format() {
        let config = FrameExtractionSettings::default().build().unwrap();
        let time = chrono::NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap()
            .and_utc();
        assert_eq!(config.format_timestamp(&time), "20240309_140500");
    }
}
