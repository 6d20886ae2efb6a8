// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Skeleton overlay rendering for videos and still images.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::annotate::PoseAnnotator;
use crate::config::{
    ImageFormat, NameTemplate, OverlayConfig, Placeholder, StreamConfig, VisualizationStyle,
};
use crate::error::{PoseError, Result};
use crate::extraction::{
    ExtractionJob, ExtractionProgress, FrameExtractor, FramePlan, OverlayFrameExtractor,
    PhaseOutcome, prepare_directory,
};
use crate::io::{maybe_resize, scaled_size};
use crate::pose::{Pose, group_by_frame};
use crate::source::{VideoBackend, VideoInfo, WriterSettings, load_image};
use crate::{verbose, warn};

/// File names of frames written by [`VideoOverlayGenerator::generate_frame_overlays`].
pub const FRAME_FILENAME_TEMPLATE: &str = "frame_{index:05}.{extension}";

/// JPEG quality of frames written by [`VideoOverlayGenerator::generate_frame_overlays`].
pub const FRAME_QUALITY: u8 = 95;

/// Progress of an overlay video run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayProgress {
    /// Completed fraction in `[0, 1]`.
    pub fraction: f64,
    /// Frames written so far.
    pub current_frame: usize,
    /// Frame count reported by the input.
    pub total_frames: usize,
}

impl OverlayProgress {
    #[allow(clippy::cast_precision_loss)]
    fn new(current_frame: usize, total_frames: usize) -> Self {
        let total = total_frames.max(current_frame);
        let fraction = if total == 0 {
            0.0
        } else {
            current_frame as f64 / total as f64
        };
        Self {
            fraction,
            current_frame,
            total_frames: total,
        }
    }
}

/// Outcome of an overlay video run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayReport {
    /// Frames written to the output video.
    pub frames_written: usize,
    /// Frames on which at least one pose was drawn.
    pub frames_annotated: usize,
    /// Frames written undecorated because drawing failed.
    pub draw_failures: usize,
    /// Whether the run stopped early on cancellation.
    pub cancelled: bool,
    /// Output video path.
    pub output_path: PathBuf,
}

/// Renders pose skeletons onto every frame of a video.
pub struct VideoOverlayGenerator<'a> {
    config: &'a OverlayConfig,
    backend: &'a dyn VideoBackend,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> VideoOverlayGenerator<'a> {
    /// Create a generator.
    #[must_use]
    pub fn new(config: &'a OverlayConfig, backend: &'a dyn VideoBackend) -> Self {
        Self {
            config,
            backend,
            cancel: None,
        }
    }

    /// Stop between frames once `flag` is set.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Probe an input video.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::InputError`] if the video cannot be opened.
    pub fn video_info(&self, path: &Path) -> Result<VideoInfo> {
        crate::source::video_info(self.backend, path)
    }

    /// Write a copy of `input` with the poses of each frame drawn on it.
    ///
    /// The output has exactly one frame per input frame. A frame whose poses cannot be drawn is
    /// written undecorated and counted in [`OverlayReport::draw_failures`].
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::InputError`] if the input cannot be opened (the output file is not
    /// created in that case), or a video error if encoding fails.
    pub fn generate_overlay_video(
        &self,
        input: &Path,
        poses: &[Pose],
        output: &Path,
        mut progress: Option<&mut dyn FnMut(&OverlayProgress)>,
    ) -> Result<OverlayReport> {
        let mut reader = self.backend.open(input)?;
        let info = reader.info().clone();

        let (width, height) = match self.config.resize_factor() {
            Some(factor) => scaled_size(info.width, info.height, factor),
            None => (info.width, info.height),
        };
        let settings = WriterSettings {
            width,
            height,
            fps: self.config.fps().unwrap_or(info.fps),
            codec: self.config.codec(),
        };
        verbose!(
            "Overlay video: {}x{} @ {:.2} fps, {} frames -> {}",
            width,
            height,
            settings.fps,
            info.total_frames,
            output.display()
        );

        let mut writer = self.backend.create_writer(output, &settings)?;
        let annotator =
            PoseAnnotator::new(self.config.style(), self.config.confidence_threshold());
        let by_frame = group_by_frame(poses);
        let interval = self.config.progress_interval();

        let mut report = OverlayReport {
            frames_written: 0,
            frames_annotated: 0,
            draw_failures: 0,
            cancelled: false,
            output_path: output.to_path_buf(),
        };
        let mut last_reported = 0;

        for (index, frame) in reader.by_ref().enumerate() {
            if self.is_cancelled() {
                warn!("Overlay video cancelled at frame {index}");
                report.cancelled = true;
                break;
            }
            let frame = frame?;

            let frame = match by_frame.get(&index) {
                Some(frame_poses) => match annotator.annotate(&frame, frame_poses) {
                    Ok(drawn) => {
                        report.frames_annotated += 1;
                        drawn
                    }
                    Err(e) => {
                        warn!("Failed to draw poses on frame {index}: {e}");
                        report.draw_failures += 1;
                        frame
                    }
                },
                None => frame,
            };

            let frame = maybe_resize(frame, self.config.resize_factor())?;
            writer.write_frame(&frame)?;
            report.frames_written += 1;

            let done = report.frames_written;
            if (done % interval == 0 || done == info.total_frames)
                && let Some(cb) = progress.as_deref_mut()
            {
                cb(&OverlayProgress::new(done, info.total_frames));
                last_reported = done;
            }
        }
        drop(reader);

        if last_reported != report.frames_written
            && !report.cancelled
            && let Some(cb) = progress.as_deref_mut()
        {
            cb(&OverlayProgress::new(report.frames_written, info.total_frames));
        }

        writer.finish()?;
        Ok(report)
    }

    /// Write the frames of `input` with their poses drawn as individual JPEG images.
    ///
    /// Frames inside the half-open `frame_range` (all frames when `None`) are written to
    /// `directory` as `frame_00042.jpg`, scaled by the configured resize factor. The directory is
    /// created only once the input has been opened.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::InputError`] if the input cannot be opened, or an IO error if the
    /// directory cannot be created. Per-frame failures are reported in the outcome.
    pub fn generate_frame_overlays(
        &self,
        input: &Path,
        poses: &[Pose],
        directory: &Path,
        frame_range: Option<(usize, usize)>,
        progress: Option<&mut dyn FnMut(&ExtractionProgress)>,
    ) -> Result<PhaseOutcome> {
        let reader = self.backend.open(input)?;
        let directory = prepare_directory(directory)?;
        let filename_template = NameTemplate::parse(
            FRAME_FILENAME_TEMPLATE,
            &[Placeholder::Index, Placeholder::Extension],
        )?;

        let stream = StreamConfig {
            enabled: true,
            format: ImageFormat::Jpeg,
            quality: FRAME_QUALITY,
            resize_factor: self.config.resize_factor(),
            valid_frames_only: false,
        };
        let annotator =
            PoseAnnotator::new(self.config.style(), self.config.confidence_threshold());
        let extractor = OverlayFrameExtractor::new(stream, annotator, group_by_frame(poses));
        let plan = FramePlan::new(frame_range, 1);
        verbose!("Writing overlay frames to {}", directory.display());

        Ok(extractor.extract(
            ExtractionJob {
                reader,
                plan: &plan,
                directory: &directory,
                filename_template: &filename_template,
                cancel: self.cancel.as_deref(),
            },
            progress,
        ))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Draw poses onto a still image and save it.
///
/// The output format follows the output path's extension.
///
/// # Errors
///
/// Returns [`PoseError::InputError`] if the input cannot be loaded, a validation error if a pose
/// is malformed, or an image error if saving fails.
pub fn annotate_image_file(
    input: &Path,
    poses: &[Pose],
    output: &Path,
    style: &VisualizationStyle,
    confidence_threshold: f32,
) -> Result<()> {
    let image = load_image(input)?;
    let annotator = PoseAnnotator::new(style, confidence_threshold);
    let refs: Vec<&Pose> = poses.iter().collect();
    let annotated = annotator.annotate(&image, &refs)?;

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    annotated.save(output).map_err(|e| {
        PoseError::ImageError(format!("Failed to save {}: {e}", output.display()))
    })
}
