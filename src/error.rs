// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the pose export pipeline.

use std::fmt;

/// Result type alias for pose pipeline operations.
pub type Result<T> = std::result::Result<T, PoseError>;

/// Main error type for the pose pipeline.
#[derive(Debug)]
pub enum PoseError {
    /// Invalid configuration value, raised when a config is constructed.
    ConfigError(String),
    /// Missing or unreadable input video or image.
    InputError(String),
    /// The pose-estimation engine failed.
    DetectionError(String),
    /// A single frame could not be written.
    FrameWriteError {
        /// Index of the frame in the source video.
        frame: usize,
        /// Underlying cause.
        message: String,
    },
    /// An export artifact could not be produced.
    ArtifactError(String),
    /// A pose record is malformed.
    ValidationError(String),
    /// Error processing images.
    ImageError(String),
    /// Video decode/encode error.
    VideoError(String),
    /// CSV serialization error.
    CsvError(String),
    /// JSON serialization or parsing error.
    JsonError(String),
    /// IO error with context.
    IoError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
    /// Feature not enabled.
    FeatureNotEnabled(String),
}

impl fmt::Display for PoseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::InputError(msg) => write!(f, "Input error: {msg}"),
            Self::DetectionError(msg) => write!(f, "Detection error: {msg}"),
            Self::FrameWriteError { frame, message } => {
                write!(f, "Frame write error (frame {frame}): {message}")
            }
            Self::ArtifactError(msg) => write!(f, "Artifact error: {msg}"),
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::VideoError(msg) => write!(f, "Video error: {msg}"),
            Self::CsvError(msg) => write!(f, "CSV error: {msg}"),
            Self::JsonError(msg) => write!(f, "JSON error: {msg}"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::FeatureNotEnabled(msg) => write!(f, "Feature not enabled: {msg}"),
        }
    }
}

impl std::error::Error for PoseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PoseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for PoseError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

impl From<csv::Error> for PoseError {
    fn from(err: csv::Error) -> Self {
        Self::CsvError(err.to_string())
    }
}

impl From<serde_json::Error> for PoseError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PoseError::ConfigError("test".to_string());
        assert_eq!(err.to_string(), "Config error: test");

        let err = PoseError::FrameWriteError {
            frame: 7,
            message: "disk full".to_string(),
        };
        assert_eq!(err.to_string(), "Frame write error (frame 7): disk full");
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error;

        let err = PoseError::from(std::io::Error::other("boom"));
        assert!(err.source().is_some());
        assert!(PoseError::InputError("x".into()).source().is_none());
    }
}
