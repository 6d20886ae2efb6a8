// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Input media handling.
//!
//! Videos are read through a [`VideoBackend`], which opens a [`VideoReader`] yielding decoded
//! frames one at a time and creates [`VideoSink`]s for encoding. [`FfmpegBackend`] is the
//! production backend (requires the `video` feature); tests plug in in-memory backends.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::config::VideoCodec;
use crate::error::{PoseError, Result};
use crate::io::VideoSink;

/// Video file extensions recognised as video input.
pub const VIDEO_EXTENSIONS: [&str; 10] = [
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "mpeg", "mpg",
];

/// Image file extensions recognised as image input.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// Kind of an input file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Video file.
    Video,
}

impl MediaKind {
    /// Classify a path by extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else {
            None
        }
    }
}

/// Check that an input file exists and has a supported extension.
///
/// # Errors
///
/// Returns [`PoseError::InputError`] for missing files, directories and unsupported extensions.
pub fn validate_input_file(path: &Path) -> Result<MediaKind> {
    if !path.exists() {
        return Err(PoseError::InputError(format!(
            "Input file not found: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(PoseError::InputError(format!(
            "Input is not a file: {}",
            path.display()
        )));
    }
    MediaKind::from_path(path).ok_or_else(|| {
        PoseError::InputError(format!(
            "Unsupported input format: {}. Supported: {}, {}",
            path.display(),
            IMAGE_EXTENSIONS.join(", "),
            VIDEO_EXTENSIONS.join(", ")
        ))
    })
}

/// Load a still image.
///
/// # Errors
///
/// Returns [`PoseError::InputError`] if the image cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| {
        PoseError::InputError(format!("Failed to load image {}: {e}", path.display()))
    })
}

/// File stem of a video path, used in generated directory names.
#[must_use]
pub fn video_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "video".to_string(), |s| s.to_string_lossy().to_string())
}

/// Properties of an opened video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: f32,
    /// Frame count reported by the container.
    pub total_frames: usize,
}

impl VideoInfo {
    /// Duration in seconds.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn duration(&self) -> f64 {
        if self.fps > 0.0 {
            self.total_frames as f64 / f64::from(self.fps)
        } else {
            0.0
        }
    }
}

/// Sequential frame reader over an opened video.
///
/// Frames are yielded in order, one at a time; the reader never buffers the whole video.
/// Dropping the reader releases the underlying decoder.
pub trait VideoReader: Iterator<Item = Result<DynamicImage>> {
    /// Properties of the opened video.
    fn info(&self) -> &VideoInfo;
}

/// Output video parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriterSettings {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: f32,
    /// Output codec.
    pub codec: VideoCodec,
}

/// Opens video readers and writers.
pub trait VideoBackend {
    /// Open a video for sequential decoding.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::InputError`] if the video cannot be opened.
    fn open(&self, path: &Path) -> Result<Box<dyn VideoReader>>;

    /// Create a video writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder cannot be created.
    fn create_writer(&self, path: &Path, settings: &WriterSettings) -> Result<Box<dyn VideoSink>>;

    /// Read the properties of a video without decoding frames.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::InputError`] if the video cannot be opened.
    fn probe(&self, path: &Path) -> Result<VideoInfo> {
        Ok(self.open(path)?.info().clone())
    }
}

/// FFmpeg-backed video I/O through `video-rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl VideoBackend for FfmpegBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoReader>> {
        if !path.is_file() {
            return Err(PoseError::InputError(format!(
                "Video not found: {}",
                path.display()
            )));
        }
        open_decoder(path)
    }

    fn create_writer(&self, path: &Path, settings: &WriterSettings) -> Result<Box<dyn VideoSink>> {
        create_encoder(path, settings)
    }
}

#[cfg(feature = "video")]
fn open_decoder(path: &Path) -> Result<Box<dyn VideoReader>> {
    Ok(Box::new(DecoderReader::new(path)?))
}

#[cfg(not(feature = "video"))]
fn open_decoder(path: &Path) -> Result<Box<dyn VideoReader>> {
    Err(PoseError::FeatureNotEnabled(format!(
        "Video support requires the 'video' feature (cannot open {})",
        path.display()
    )))
}

#[cfg(feature = "video")]
fn create_encoder(path: &Path, settings: &WriterSettings) -> Result<Box<dyn VideoSink>> {
    Ok(Box::new(crate::io::VideoWriter::new(path, settings)?))
}

#[cfg(not(feature = "video"))]
fn create_encoder(path: &Path, _settings: &WriterSettings) -> Result<Box<dyn VideoSink>> {
    Err(PoseError::FeatureNotEnabled(format!(
        "Video support requires the 'video' feature (cannot write {})",
        path.display()
    )))
}

/// Frame reader over a `video-rs` decoder.
#[cfg(feature = "video")]
pub struct DecoderReader {
    decoder: video_rs::decode::Decoder,
    info: VideoInfo,
    path: PathBuf,
}

#[cfg(feature = "video")]
impl DecoderReader {
    /// Open a decoder.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::InputError`] if `video-rs` cannot open the file.
    pub fn new(path: &Path) -> Result<Self> {
        crate::io::init_video();

        let decoder = video_rs::decode::Decoder::new(path).map_err(|e| {
            PoseError::InputError(format!("Failed to open video {}: {e}", path.display()))
        })?;

        let (width, height) = decoder.size();
        let fps = decoder.frame_rate();
        // Frame count estimated from duration and frame rate.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total_frames = decoder
            .duration()
            .map(|d| (d.as_secs_f64() * f64::from(fps)).round() as usize)
            .unwrap_or(0);

        Ok(Self {
            decoder,
            info: VideoInfo {
                width,
                height,
                fps,
                total_frames,
            },
            path: path.to_path_buf(),
        })
    }
}

#[cfg(feature = "video")]
impl VideoReader for DecoderReader {
    fn info(&self) -> &VideoInfo {
        &self.info
    }
}

#[cfg(feature = "video")]
impl Iterator for DecoderReader {
    type Item = Result<DynamicImage>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.decoder.decode() {
            Ok((_ts, frame)) => Some(video_frame_to_image(&frame).map_err(|e| {
                PoseError::VideoError(format!("{}: {e}", self.path.display()))
            })),
            Err(video_rs::Error::DecodeExhausted) => None,
            Err(e) => Some(Err(PoseError::VideoError(format!(
                "Failed to decode {}: {e}",
                self.path.display()
            )))),
        }
    }
}

/// Convert a `video_rs` HWC frame to a `DynamicImage`.
#[cfg(feature = "video")]
fn video_frame_to_image(frame: &video_rs::Frame) -> Result<DynamicImage> {
    let (height, width, _) = frame.dim();
    let height = u32::try_from(height)
        .map_err(|_| PoseError::ImageError("Frame height exceeds u32::MAX".to_string()))?;
    let width = u32::try_from(width)
        .map_err(|_| PoseError::ImageError("Frame width exceeds u32::MAX".to_string()))?;

    let rgb_data: Vec<u8> = frame.iter().copied().collect();
    let buffer = image::RgbImage::from_raw(width, height, rgb_data).ok_or_else(|| {
        PoseError::ImageError("Failed to create image from video frame".to_string())
    })?;
    Ok(DynamicImage::ImageRgb8(buffer))
}

/// Probe a video file through a backend.
///
/// # Errors
///
/// Returns [`PoseError::InputError`] if the file is missing or cannot be opened.
pub fn video_info(backend: &dyn VideoBackend, path: &Path) -> Result<VideoInfo> {
    if !path.exists() {
        return Err(PoseError::InputError(format!(
            "Video not found: {}",
            path.display()
        )));
    }
    backend.probe(path)
}

/// Path of a sibling file with a suffix appended to the stem.
#[must_use]
pub fn with_stem_suffix(path: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().to_string());
    path.with_file_name(format!("{stem}{suffix}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind() {
        assert_eq!(
            MediaKind::from_path(Path::new("clip.MP4")),
            Some(MediaKind::Video)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("photo.jpeg")),
            Some(MediaKind::Image)
        );
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_validate_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.mp4");
        assert!(matches!(
            validate_input_file(&missing),
            Err(PoseError::InputError(_))
        ));

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "x").unwrap();
        assert!(validate_input_file(&text).is_err());

        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, "x").unwrap();
        assert_eq!(validate_input_file(&video).unwrap(), MediaKind::Video);
    }

    #[test]
    fn test_video_name_and_suffix() {
        assert_eq!(video_name(Path::new("/data/walk.mp4")), "walk");
        assert_eq!(
            with_stem_suffix(Path::new("out/pose.json"), "_overlay", "mp4"),
            PathBuf::from("out/pose_overlay.mp4")
        );
    }

    #[test]
    fn test_ffmpeg_backend_missing_file() {
        let err = FfmpegBackend
            .open(Path::new("/nonexistent/clip.mp4"))
            .err()
            .unwrap();
        assert!(matches!(err, PoseError::InputError(_)));
    }

    #[test]
    fn test_video_info_duration() {
        let info = VideoInfo {
            width: 4,
            height: 4,
            fps: 25.0,
            total_frames: 50,
        };
        assert!((info.duration() - 2.0).abs() < f64::EPSILON);
    }
}
