// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Output utilities: frame image encoding, resizing and video encoding.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, PngEncoder};
use image::{DynamicImage, RgbImage};

#[cfg(feature = "video")]
use video_rs::{Encoder, Time, encode::Settings as EncoderSettings};

use crate::config::ImageFormat;
use crate::error::{PoseError, Result};

#[cfg(feature = "video")]
use crate::source::WriterSettings;

#[cfg(feature = "video")]
use std::sync::Once;

#[cfg(feature = "video")]
static INIT: Once = Once::new();

/// Initialize `video-rs` once and silence FFmpeg logs.
///
/// Safe to call multiple times.
#[allow(clippy::missing_const_for_fn)]
pub fn init_video() {
    #[cfg(feature = "video")]
    INIT.call_once(|| {
        if let Err(e) = video_rs::init() {
            crate::warn!("Failed to initialize video-rs: {e}");
        }
    });
}

/// Sequential video frame writer.
///
/// Dropping a sink without calling [`finish`](Self::finish) releases the encoder but may leave
/// a truncated file.
pub trait VideoSink {
    /// Append a frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame size differs from the video size or encoding fails.
    fn write_frame(&mut self, frame: &DynamicImage) -> Result<()>;

    /// Flush and close the video.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails to finish.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// A `video-rs` encoder writing frames at a fixed rate.
#[cfg(feature = "video")]
pub struct VideoWriter {
    encoder: Encoder,
    frame_duration: Time,
    position: Time,
    width: usize,
    height: usize,
}

#[cfg(feature = "video")]
impl VideoWriter {
    /// Create a new `VideoWriter`.
    ///
    /// # Arguments
    ///
    /// * `path` - Output video path (e.g., "output.mp4").
    /// * `settings` - Frame size, rate and codec.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder cannot be initialized.
    pub fn new(path: &Path, settings: &WriterSettings) -> Result<Self> {
        init_video();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                PoseError::IoError(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let width = settings.width as usize;
        let height = settings.height as usize;
        let encoder_settings = match settings.codec {
            crate::config::VideoCodec::H264 => {
                EncoderSettings::preset_h264_yuv420p(width, height, false)
            }
        };
        let encoder = Encoder::new(path, encoder_settings).map_err(|e| {
            PoseError::VideoError(format!("Failed to create video encoder: {e}"))
        })?;

        let frame_duration = Time::from_secs_f64(1.0 / f64::from(settings.fps));

        Ok(Self {
            encoder,
            frame_duration,
            position: Time::zero(),
            width,
            height,
        })
    }
}

#[cfg(feature = "video")]
impl VideoSink for VideoWriter {
    fn write_frame(&mut self, frame: &DynamicImage) -> Result<()> {
        let buffer = frame.to_rgb8();
        let width = buffer.width() as usize;
        let height = buffer.height() as usize;

        if width != self.width || height != self.height {
            return Err(PoseError::VideoError(format!(
                "Frame dimensions {width}x{height} do not match video dimensions {}x{}",
                self.width, self.height
            )));
        }

        let frame_array = ndarray::Array3::from_shape_vec((height, width, 3), buffer.into_raw())
            .map_err(|e| PoseError::VideoError(e.to_string()))?;

        self.encoder
            .encode(&frame_array, self.position)
            .map_err(|e| PoseError::VideoError(format!("Failed to encode frame: {e}")))?;

        self.position = self.position.aligned_with(self.frame_duration).add();
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.encoder
            .finish()
            .map_err(|e| PoseError::VideoError(format!("Failed to finish video encoding: {e}")))
    }
}

/// PNG compression effort for a `[0, 100]` quality value.
///
/// Lower quality means stronger compression; PNG stays lossless either way.
#[must_use]
pub fn png_compression(quality: u8) -> CompressionType {
    match (100 - quality.min(100)) / 11 {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Encode an image to a file in the given format.
///
/// The file is opened and closed within this call.
///
/// # Errors
///
/// Returns an error if the file cannot be created or encoding fails.
pub fn save_frame_image(
    image: &DynamicImage,
    path: &Path,
    format: ImageFormat,
    quality: u8,
) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| PoseError::IoError(format!("Failed to create {}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());

    match format {
        ImageFormat::Jpeg => {
            rgb.write_with_encoder(JpegEncoder::new_with_quality(
                &mut writer,
                quality.clamp(1, 100),
            ))?;
        }
        ImageFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut writer,
                png_compression(quality),
                image::codecs::png::FilterType::Adaptive,
            );
            rgb.write_with_encoder(encoder)?;
        }
        ImageFormat::Bmp => {
            rgb.write_with_encoder(BmpEncoder::new(&mut writer))?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Dimensions after scaling, never below 1x1.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn scaled_size(width: u32, height: u32, factor: f32) -> (u32, u32) {
    let w = (width as f32 * factor).round().max(1.0) as u32;
    let h = (height as f32 * factor).round().max(1.0) as u32;
    (w, h)
}

/// Resize an image by a factor with bilinear filtering.
///
/// # Errors
///
/// Returns [`PoseError::ImageError`] if the resizer rejects the buffers.
pub fn resize_image(image: &DynamicImage, factor: f32) -> Result<DynamicImage> {
    let src_rgb = image.to_rgb8();
    let (src_w, src_h) = src_rgb.dimensions();
    let (dst_w, dst_h) = scaled_size(src_w, src_h, factor);
    if (dst_w, dst_h) == (src_w, src_h) {
        return Ok(DynamicImage::ImageRgb8(src_rgb));
    }

    let src_image = Image::from_vec_u8(src_w, src_h, src_rgb.into_raw(), PixelType::U8x3)
        .map_err(|e| PoseError::ImageError(format!("Failed to create source image: {e}")))?;
    let mut dst_image = Image::new(dst_w, dst_h, PixelType::U8x3);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    Resizer::new()
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| PoseError::ImageError(format!("Failed to resize image: {e}")))?;

    let resized = RgbImage::from_raw(dst_w, dst_h, dst_image.into_vec())
        .ok_or_else(|| PoseError::ImageError("Failed to create resized buffer".to_string()))?;
    Ok(DynamicImage::ImageRgb8(resized))
}

/// Resize when a factor is configured.
///
/// # Errors
///
/// Returns an error if resizing fails.
pub fn maybe_resize(image: DynamicImage, factor: Option<f32>) -> Result<DynamicImage> {
    match factor {
        Some(f) => resize_image(&image, f),
        None => Ok(image),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        }))
    }

    #[test]
    fn test_save_each_format() {
        let dir = tempfile::tempdir().unwrap();
        let img = checkerboard(8, 6);
        for format in [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Bmp] {
            let path = dir.path().join(format!("frame.{}", format.extension()));
            save_frame_image(&img, &path, format, 90).unwrap();
            let loaded = image::open(&path).unwrap();
            assert_eq!((loaded.width(), loaded.height()), (8, 6));
        }
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/frame.jpg");
        let err = save_frame_image(&checkerboard(2, 2), &path, ImageFormat::Jpeg, 95);
        assert!(matches!(err, Err(PoseError::IoError(_))));
    }

    #[test]
    fn test_resize() {
        let resized = resize_image(&checkerboard(20, 10), 0.5).unwrap();
        assert_eq!((resized.width(), resized.height()), (10, 5));
        assert_eq!(scaled_size(3, 3, 0.01), (1, 1));

        let same = maybe_resize(checkerboard(4, 4), None).unwrap();
        assert_eq!(same.width(), 4);
    }

    #[test]
    fn test_png_compression_mapping() {
        assert_eq!(png_compression(100), CompressionType::Fast);
        assert_eq!(png_compression(50), CompressionType::Default);
        assert_eq!(png_compression(0), CompressionType::Best);
    }
}
