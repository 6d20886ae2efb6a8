// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame extraction into image directories.
//!
//! A run writes up to two streams of the same video: raw frames and frames with skeletons drawn.
//! Each stream gets its own directory named from the configured template
//! (`{base}/{type}_{video_name}_{timestamp}` by default) and runs in its own failure boundary:
//! a raw failure never prevents the overlay stream and vice versa.
//!
//! Poses are drawn as given, so callers pass poses that are already filtered. The configured
//! thresholds only decide which frames a valid-only stream writes.
//!
//! | Stream  | Extractor                  | Directory type (default) |
//! |---------|----------------------------|--------------------------|
//! | raw     | [`RawFrameExtractor`]      | `frames`                 |
//! | overlay | [`OverlayFrameExtractor`]  | `overlay`                |

mod extractor;
mod plan;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub use extractor::{
    ExtractionJob, ExtractionPhase, FrameExtractor, OverlayFrameExtractor, RawFrameExtractor,
    prepare_directory,
};
pub use plan::{FrameDecision, FramePlan};

use crate::annotate::PoseAnnotator;
use crate::config::{FrameExtractionConfig, StreamConfig, TemplateValues};
use crate::error::Result;
use crate::filter::get_frames_with_valid_poses;
use crate::pose::{Pose, group_by_frame};
use crate::source::{VideoBackend, video_info, video_name};
use crate::{error, success, verbose};

/// Where a manager is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionState {
    /// Nothing has run yet.
    #[default]
    NotStarted,
    /// Writing raw frames.
    ExtractingRaw,
    /// Writing overlay frames.
    ExtractingOverlay,
    /// All requested phases finished, successfully or not.
    Completed,
}

/// Progress of one extraction phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionProgress {
    /// Completed fraction of the planned frames in `[0, 1]`.
    pub fraction: f64,
    /// Absolute index of the frame just processed.
    pub frame_index: usize,
    /// Frames the phase plans to write.
    pub total_frames: usize,
    /// Phase name, `raw` or `overlay`.
    pub phase: &'static str,
}

impl ExtractionProgress {
    #[allow(clippy::cast_precision_loss)]
    fn new(frame_index: usize, done: usize, planned: usize, phase: ExtractionPhase) -> Self {
        let total = planned.max(done);
        let fraction = if total == 0 {
            1.0
        } else {
            done as f64 / total as f64
        };
        Self {
            fraction,
            frame_index,
            total_frames: total,
            phase: phase.as_str(),
        }
    }
}

/// Counts and files produced by one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReport {
    /// Output directory.
    pub directory: PathBuf,
    /// Files written, in frame order.
    pub written: Vec<PathBuf>,
    /// Frames inside the range and on the stride.
    pub frames_considered: usize,
    /// Frames written successfully.
    pub frames_written: usize,
    /// Considered frames without a valid pose (valid-only streams).
    pub frames_skipped_invalid: usize,
    /// Frames that failed to decode, render or write.
    pub frames_failed: usize,
}

impl StreamReport {
    /// Empty report for a directory.
    #[must_use]
    pub const fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            written: Vec::new(),
            frames_considered: 0,
            frames_written: 0,
            frames_skipped_invalid: 0,
            frames_failed: 0,
        }
    }
}

/// Result of one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// The stream is disabled in the config.
    Disabled,
    /// The phase ran to the end of the planned frames.
    Completed(StreamReport),
    /// The phase could not run, or stopped on a frame it could not decode.
    Failed {
        /// What went wrong.
        error: String,
        /// Frames written before the failure, if the phase got that far.
        report: Option<StreamReport>,
    },
    /// The cancel flag stopped the phase.
    Cancelled(StreamReport),
}

impl PhaseOutcome {
    /// Report of a phase that ran, fully or partially.
    #[must_use]
    pub const fn report(&self) -> Option<&StreamReport> {
        match self {
            Self::Completed(report) | Self::Cancelled(report) => Some(report),
            Self::Failed { report, .. } => report.as_ref(),
            Self::Disabled => None,
        }
    }

    /// Whether the phase completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Whether the phase failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcome of both phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResults {
    /// Raw stream outcome.
    pub raw: PhaseOutcome,
    /// Overlay stream outcome.
    pub overlay: PhaseOutcome,
}

/// Totals across phases.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionSummary {
    /// Frames written by all phases.
    pub frames_written: usize,
    /// Frames that failed in all phases.
    pub frames_failed: usize,
    /// Invalid frames skipped by all phases.
    pub frames_skipped_invalid: usize,
    /// Directories that received frames.
    pub directories: Vec<PathBuf>,
    /// Names of phases that failed.
    pub failed_phases: Vec<&'static str>,
}

impl ExtractionResults {
    /// Aggregate the per-phase outcomes.
    #[must_use]
    pub fn summary(&self) -> ExtractionSummary {
        let mut summary = ExtractionSummary::default();
        for (phase, outcome) in [
            (ExtractionPhase::Raw, &self.raw),
            (ExtractionPhase::Overlay, &self.overlay),
        ] {
            if outcome.is_failed() {
                summary.failed_phases.push(phase.as_str());
            }
            if let Some(report) = outcome.report() {
                summary.frames_written += report.frames_written;
                summary.frames_failed += report.frames_failed;
                summary.frames_skipped_invalid += report.frames_skipped_invalid;
                summary.directories.push(report.directory.clone());
            }
        }
        summary
    }

    /// Whether every enabled phase completed.
    #[must_use]
    pub const fn all_completed(&self) -> bool {
        matches!(
            (&self.raw, &self.overlay),
            (
                PhaseOutcome::Completed(_) | PhaseOutcome::Disabled,
                PhaseOutcome::Completed(_) | PhaseOutcome::Disabled
            )
        )
    }
}

/// Coordinates raw and overlay frame extraction for one video.
pub struct FrameExtractionManager<'a> {
    config: &'a FrameExtractionConfig,
    backend: &'a dyn VideoBackend,
    timestamp: String,
    cancel: Option<Arc<AtomicBool>>,
    state: ExtractionState,
}

impl<'a> FrameExtractionManager<'a> {
    /// Create a manager stamped with the current local time.
    #[must_use]
    pub fn new(config: &'a FrameExtractionConfig, backend: &'a dyn VideoBackend) -> Self {
        let timestamp = config.format_timestamp(&chrono::Local::now());
        Self {
            config,
            backend,
            timestamp,
            cancel: None,
            state: ExtractionState::NotStarted,
        }
    }

    /// Use a fixed time for directory names.
    #[must_use]
    pub fn with_timestamp<Tz>(mut self, time: &chrono::DateTime<Tz>) -> Self
    where
        Tz: chrono::TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        self.timestamp = self.config.format_timestamp(time);
        self
    }

    /// Stop between frames once `flag` is set.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ExtractionState {
        self.state
    }

    /// Output directory of a phase for a video.
    #[must_use]
    pub fn output_directory(&self, phase: ExtractionPhase, video: &Path) -> PathBuf {
        let settings = self.config.settings();
        let kind = match phase {
            ExtractionPhase::Raw => &settings.raw_directory_type,
            ExtractionPhase::Overlay => &settings.overlay_directory_type,
        };
        let name = video_name(video);
        let dir_name = self.config.directory_template().render(&TemplateValues {
            kind,
            video_name: &name,
            timestamp: &self.timestamp,
            ..TemplateValues::default()
        });
        self.config.base_output_directory().join(dir_name)
    }

    /// Extract raw frames, then overlay frames.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::InputError`](crate::PoseError::InputError) if the video cannot be
    /// opened; no directory is created in that case. Phase failures are reported in the results.
    pub fn extract_all_frame_types(
        &mut self,
        video: &Path,
        poses: &[Pose],
        mut progress: Option<&mut dyn FnMut(&ExtractionProgress)>,
    ) -> Result<ExtractionResults> {
        video_info(self.backend, video)?;

        self.state = ExtractionState::ExtractingRaw;
        let raw = self.run_raw(
            video,
            poses,
            progress
                .as_mut()
                .map(|p| &mut **p as &mut dyn FnMut(&ExtractionProgress)),
        );

        self.state = ExtractionState::ExtractingOverlay;
        let overlay = self.run_overlay(
            video,
            poses,
            progress
                .as_mut()
                .map(|p| &mut **p as &mut dyn FnMut(&ExtractionProgress)),
        );

        self.state = ExtractionState::Completed;
        let results = ExtractionResults { raw, overlay };
        let summary = results.summary();
        if summary.failed_phases.is_empty() {
            success!(
                "Extracted {} frames into {} directories",
                summary.frames_written,
                summary.directories.len()
            );
        }
        Ok(results)
    }

    /// Extract only raw frames.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::InputError`](crate::PoseError::InputError) if the video cannot be
    /// opened.
    pub fn extract_raw_frames(
        &mut self,
        video: &Path,
        poses: &[Pose],
        progress: Option<&mut dyn FnMut(&ExtractionProgress)>,
    ) -> Result<PhaseOutcome> {
        video_info(self.backend, video)?;
        self.state = ExtractionState::ExtractingRaw;
        let outcome = self.run_raw(video, poses, progress);
        self.state = ExtractionState::Completed;
        Ok(outcome)
    }

    /// Extract only overlay frames.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::InputError`](crate::PoseError::InputError) if the video cannot be
    /// opened.
    pub fn extract_overlay_frames(
        &mut self,
        video: &Path,
        poses: &[Pose],
        progress: Option<&mut dyn FnMut(&ExtractionProgress)>,
    ) -> Result<PhaseOutcome> {
        video_info(self.backend, video)?;
        self.state = ExtractionState::ExtractingOverlay;
        let outcome = self.run_overlay(video, poses, progress);
        self.state = ExtractionState::Completed;
        Ok(outcome)
    }

    fn run_raw(
        &self,
        video: &Path,
        poses: &[Pose],
        progress: Option<&mut dyn FnMut(&ExtractionProgress)>,
    ) -> PhaseOutcome {
        let stream = *self.config.raw();
        if !stream.enabled {
            return PhaseOutcome::Disabled;
        }
        let extractor = RawFrameExtractor::new(stream);
        self.run_phase(&extractor, video, poses, progress)
    }

    fn run_overlay(
        &self,
        video: &Path,
        poses: &[Pose],
        progress: Option<&mut dyn FnMut(&ExtractionProgress)>,
    ) -> PhaseOutcome {
        let stream = *self.config.overlay();
        if !stream.enabled {
            return PhaseOutcome::Disabled;
        }
        let threshold = self.config.confidence_threshold();
        let annotator = PoseAnnotator::new(self.config.style(), threshold);
        let extractor = OverlayFrameExtractor::new(stream, annotator, group_by_frame(poses));
        self.run_phase(&extractor, video, poses, progress)
    }

    fn plan_for(&self, stream: &StreamConfig, poses: &[Pose]) -> FramePlan {
        let plan = FramePlan::new(self.config.frame_range(), self.config.frame_skip());
        if stream.valid_frames_only {
            plan.with_valid_frames(get_frames_with_valid_poses(
                poses,
                self.config.confidence_threshold(),
                self.config.min_valid_joints(),
            ))
        } else {
            plan
        }
    }

    fn run_phase(
        &self,
        extractor: &dyn FrameExtractor,
        video: &Path,
        poses: &[Pose],
        progress: Option<&mut dyn FnMut(&ExtractionProgress)>,
    ) -> PhaseOutcome {
        let phase = extractor.phase();
        let directory = self.output_directory(phase, video);
        let plan = self.plan_for(extractor.stream(), poses);

        let run = || -> Result<PhaseOutcome> {
            let directory = prepare_directory(&directory)?;
            let reader = self.backend.open(video)?;
            verbose!("Extracting {phase} frames to {}", directory.display());
            Ok(extractor.extract(
                ExtractionJob {
                    reader,
                    plan: &plan,
                    directory: &directory,
                    filename_template: self.config.filename_template(),
                    cancel: self.cancel.as_deref(),
                },
                progress,
            ))
        };

        match run() {
            Ok(outcome) => {
                if let Some(report) = outcome.report() {
                    verbose!(
                        "{phase}: {} written, {} skipped (no valid pose), {} failed",
                        report.frames_written,
                        report.frames_skipped_invalid,
                        report.frames_failed
                    );
                }
                outcome
            }
            Err(e) => {
                error!("{phase} frame extraction failed: {e}");
                PhaseOutcome::Failed {
                    error: e.to_string(),
                    report: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameExtractionSettings;

    #[test]
    fn test_output_directory_from_template() {
        let config = FrameExtractionSettings::new()
            .with_base_output_directory("/tmp/out")
            .build()
            .unwrap();
        let backend = crate::source::FfmpegBackend;
        let time = chrono::DateTime::parse_from_rfc3339("2024-03-01T12:30:45+00:00").unwrap();
        let manager = FrameExtractionManager::new(&config, &backend).with_timestamp(&time);

        assert_eq!(
            manager.output_directory(ExtractionPhase::Raw, Path::new("/videos/walk.mp4")),
            PathBuf::from("/tmp/out/frames_walk_20240301_123045")
        );
        assert_eq!(
            manager.output_directory(ExtractionPhase::Overlay, Path::new("walk.mp4")),
            PathBuf::from("/tmp/out/overlay_walk_20240301_123045")
        );
    }

    #[test]
    fn test_missing_video_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = FrameExtractionSettings::new()
            .with_base_output_directory(dir.path().join("frames"))
            .build()
            .unwrap();
        let backend = crate::source::FfmpegBackend;
        let mut manager = FrameExtractionManager::new(&config, &backend);

        let err = manager.extract_all_frame_types(&dir.path().join("missing.mp4"), &[], None);
        assert!(matches!(err, Err(crate::PoseError::InputError(_))));
        assert!(!dir.path().join("frames").exists());
        assert_eq!(manager.state(), ExtractionState::NotStarted);
    }

    #[test]
    fn test_summary_aggregates_phases() {
        let mut raw = StreamReport::new(PathBuf::from("raw"));
        raw.frames_written = 3;
        raw.frames_skipped_invalid = 7;
        let results = ExtractionResults {
            raw: PhaseOutcome::Completed(raw),
            overlay: PhaseOutcome::Failed {
                error: "disk full".to_string(),
                report: None,
            },
        };
        let summary = results.summary();
        assert_eq!(summary.frames_written, 3);
        assert_eq!(summary.frames_skipped_invalid, 7);
        assert_eq!(summary.failed_phases, vec!["overlay"]);
        assert_eq!(summary.directories, vec![PathBuf::from("raw")]);
        assert!(!results.all_completed());
    }

    #[test]
    fn test_progress_fraction() {
        let p = ExtractionProgress::new(8, 2, 4, ExtractionPhase::Overlay);
        assert!((p.fraction - 0.5).abs() < f64::EPSILON);
        assert_eq!(p.phase, "overlay");
    }
}
