// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use image::DynamicImage;

use super::plan::{FrameDecision, FramePlan};
use super::{ExtractionProgress, PhaseOutcome, StreamReport};
use crate::annotate::PoseAnnotator;
use crate::config::{NameTemplate, StreamConfig, TemplateValues};
use crate::error::{PoseError, Result};
use crate::io::{maybe_resize, save_frame_image};
use crate::pose::Pose;
use crate::source::VideoReader;
use crate::{error, warn};

/// Extracted image stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionPhase {
    /// Frames as decoded.
    Raw,
    /// Frames with skeletons drawn.
    Overlay,
}

impl ExtractionPhase {
    /// Phase name used in progress reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Overlay => "overlay",
        }
    }
}

impl fmt::Display for ExtractionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a phase needs to run over one opened video.
pub struct ExtractionJob<'a> {
    /// Opened video; released when the job ends.
    pub reader: Box<dyn VideoReader>,
    /// Frames to write.
    pub plan: &'a FramePlan,
    /// Existing output directory.
    pub directory: &'a Path,
    /// Frame file name template.
    pub filename_template: &'a NameTemplate,
    /// Checked once per frame.
    pub cancel: Option<&'a AtomicBool>,
}

/// Writes one image stream of a video to a directory.
pub trait FrameExtractor {
    /// Which stream this extractor produces.
    fn phase(&self) -> ExtractionPhase;

    /// Encoding settings of the stream.
    fn stream(&self) -> &StreamConfig;

    /// Turn a decoded frame into the image to write.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be prepared; the frame is then counted as failed.
    fn render(&self, index: usize, frame: DynamicImage) -> Result<DynamicImage>;

    /// Decode the job's video and write every planned frame.
    ///
    /// Render and write failures are logged and counted; the loop continues. A planned frame that
    /// cannot be decoded ends the phase as [`PhaseOutcome::Failed`] carrying the frames written
    /// so far.
    fn extract(
        &self,
        job: ExtractionJob<'_>,
        mut progress: Option<&mut dyn FnMut(&ExtractionProgress)>,
    ) -> PhaseOutcome {
        let ExtractionJob {
            mut reader,
            plan,
            directory,
            filename_template,
            cancel,
        } = job;
        let phase = self.phase();
        let stream = *self.stream();
        let planned = plan.effective_count(reader.info().total_frames);

        let mut report = StreamReport::new(directory.to_path_buf());
        let mut attempted = 0;

        for (index, frame) in reader.by_ref().enumerate() {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                warn!("{phase} extraction cancelled at frame {index}");
                return PhaseOutcome::Cancelled(report);
            }
            if plan.is_past_end(index) {
                break;
            }

            match plan.decide(index) {
                FrameDecision::OutOfRange | FrameDecision::Stride => continue,
                FrameDecision::Invalid => {
                    report.frames_considered += 1;
                    report.frames_skipped_invalid += 1;
                    continue;
                }
                FrameDecision::Extract => report.frames_considered += 1,
            }
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    error!("{phase}: failed to decode frame {index}: {e}");
                    report.frames_failed += 1;
                    return PhaseOutcome::Failed {
                        error: format!("frame {index}: {e}"),
                        report: Some(report),
                    };
                }
            };

            let path = directory.join(filename_template.render(&TemplateValues {
                index,
                extension: stream.format.extension(),
                ..TemplateValues::default()
            }));
            match self.write_frame(index, frame, &path, &stream) {
                Ok(()) => {
                    report.frames_written += 1;
                    report.written.push(path);
                }
                Err(e) => {
                    error!("{e}");
                    report.frames_failed += 1;
                }
            }

            attempted += 1;
            if let Some(cb) = progress.as_deref_mut() {
                cb(&ExtractionProgress::new(index, attempted, planned, phase));
            }
        }

        PhaseOutcome::Completed(report)
    }

    /// Render and save a single frame.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::FrameWriteError`] carrying the frame index.
    fn write_frame(
        &self,
        index: usize,
        frame: DynamicImage,
        path: &Path,
        stream: &StreamConfig,
    ) -> Result<()> {
        self.render(index, frame)
            .and_then(|image| save_frame_image(&image, path, stream.format, stream.quality))
            .map_err(|e| PoseError::FrameWriteError {
                frame: index,
                message: e.to_string(),
            })
    }
}

/// Writes frames as decoded, optionally resized.
pub struct RawFrameExtractor {
    stream: StreamConfig,
}

impl RawFrameExtractor {
    /// Create a raw extractor.
    #[must_use]
    pub const fn new(stream: StreamConfig) -> Self {
        Self { stream }
    }
}

impl FrameExtractor for RawFrameExtractor {
    fn phase(&self) -> ExtractionPhase {
        ExtractionPhase::Raw
    }

    fn stream(&self) -> &StreamConfig {
        &self.stream
    }

    fn render(&self, _index: usize, frame: DynamicImage) -> Result<DynamicImage> {
        maybe_resize(frame, self.stream.resize_factor)
    }
}

/// Writes frames with the poses of each frame drawn on them.
///
/// Poses are drawn as given; validity filtering happens before they reach the extractor.
pub struct OverlayFrameExtractor<'p> {
    stream: StreamConfig,
    annotator: PoseAnnotator,
    poses: BTreeMap<usize, Vec<&'p Pose>>,
}

impl<'p> OverlayFrameExtractor<'p> {
    /// Create an overlay extractor over poses grouped by frame.
    #[must_use]
    pub const fn new(
        stream: StreamConfig,
        annotator: PoseAnnotator,
        poses: BTreeMap<usize, Vec<&'p Pose>>,
    ) -> Self {
        Self {
            stream,
            annotator,
            poses,
        }
    }
}

impl FrameExtractor for OverlayFrameExtractor<'_> {
    fn phase(&self) -> ExtractionPhase {
        ExtractionPhase::Overlay
    }

    fn stream(&self) -> &StreamConfig {
        &self.stream
    }

    fn render(&self, index: usize, frame: DynamicImage) -> Result<DynamicImage> {
        let frame = match self.poses.get(&index) {
            Some(poses) => match self.annotator.annotate(&frame, poses) {
                Ok(drawn) => drawn,
                Err(e) => {
                    warn!("Failed to draw poses on frame {index}: {e}");
                    frame
                }
            },
            None => frame,
        };
        maybe_resize(frame, self.stream.resize_factor)
    }
}

/// Directory for one stream, created if missing and reused if present.
///
/// # Errors
///
/// Returns [`PoseError::IoError`] if the path exists as a file or cannot be created.
pub fn prepare_directory(directory: &Path) -> Result<PathBuf> {
    if directory.exists() && !directory.is_dir() {
        return Err(PoseError::IoError(format!(
            "Output path exists and is not a directory: {}",
            directory.display()
        )));
    }
    std::fs::create_dir_all(directory).map_err(|e| {
        PoseError::IoError(format!(
            "Failed to create directory {}: {e}",
            directory.display()
        ))
    })?;
    Ok(directory.to_path_buf())
}
