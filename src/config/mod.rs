// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Configuration for frame extraction and overlay generation.
//!
//! Each configuration comes in two layers: a plain settings record with public fields, defaults
//! and `with_*` builders (also loadable from JSON), and an immutable validated config built from
//! it. Invalid values fail when the config is built, never while frames are being drawn.
//!
//! ```rust
//! use posedetect::config::{FrameExtractionSettings, StreamSettings};
//!
//! let config = FrameExtractionSettings::new()
//!     .with_raw(StreamSettings::new().with_format("png").with_valid_frames_only(true))
//!     .with_frame_range(10, 50)
//!     .with_frame_skip(2)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.frame_skip(), 2);
//! ```

mod extraction;
mod overlay;
mod style;
mod template;

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;

pub use extraction::{FrameExtractionConfig, FrameExtractionSettings, StreamConfig, StreamSettings};
pub use overlay::{OverlayConfig, OverlaySettings, VideoCodec};
pub use style::VisualizationStyle;
pub use template::{NameTemplate, Placeholder, TemplateValues};

use crate::error::{PoseError, Result};

/// Image encoding of extracted frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// JPEG, lossy with quality.
    Jpeg,
    /// PNG, lossless with compression derived from quality.
    Png,
    /// Uncompressed BMP.
    Bmp,
}

impl ImageFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Bmp => "bmp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = PoseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "bmp" => Ok(Self::Bmp),
            _ => Err(PoseError::ConfigError(format!(
                "Unsupported image format '{s}'. Supported: jpg, jpeg, png, bmp"
            ))),
        }
    }
}

pub(crate) fn validate_threshold(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PoseError::ConfigError(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

pub(crate) fn validate_resize_factor(name: &str, factor: Option<f32>) -> Result<()> {
    match factor {
        Some(f) if !f.is_finite() || f <= 0.0 => Err(PoseError::ConfigError(format!(
            "{name} must be positive, got {f}"
        ))),
        _ => Ok(()),
    }
}

/// Read a JSON settings file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| {
        PoseError::ConfigError(format!("Failed to read config {}: {e}", path.display()))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        PoseError::ConfigError(format!("Invalid config {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_format_from_str() {
        assert_eq!("JPEG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!(".png".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert!(matches!(
            "gif".parse::<ImageFormat>(),
            Err(PoseError::ConfigError(_))
        ));
    }

    #[test]
    fn test_validators() {
        assert!(validate_threshold("t", 0.0).is_ok());
        assert!(validate_threshold("t", 1.01).is_err());
        assert!(validate_resize_factor("r", None).is_ok());
        assert!(validate_resize_factor("r", Some(0.0)).is_err());
        assert!(validate_resize_factor("r", Some(f32::NAN)).is_err());
    }
}
