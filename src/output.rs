// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Multi-artifact export.
//!
//! [`OutputManager::export_all_formats`] filters the poses once and then writes every requested
//! artifact. The JSON document is written first and is mandatory; every other artifact runs in
//! its own failure boundary and its outcome is recorded in the [`ExportSummary`].

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{
    FrameExtractionConfig, FrameExtractionSettings, OverlayConfig, OverlaySettings,
};
use crate::error::{PoseError, Result};
use crate::export::{CsvFormat, JsonMetadata, csv_path_for, export_json, export_poses};
use crate::extraction::{FrameExtractionManager, PhaseOutcome};
use crate::filter::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MIN_VALID_JOINTS, FilteringSummary,
    filter_poses_by_validity, get_filtering_summary,
};
use crate::overlay::{VideoOverlayGenerator, annotate_image_file};
use crate::pose::Pose;
use crate::source::{MediaKind, VideoBackend, with_stem_suffix};
use crate::{error, info, section, success, verbose};

/// Kind of an exported artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    /// Pose document.
    Json,
    /// CSV table in one layout.
    Csv(CsvFormat),
    /// Video with skeletons drawn.
    OverlayVideo,
    /// Still image with skeletons drawn.
    OverlayImage,
    /// Directory of frame images with skeletons drawn, next to the output.
    FrameOverlays,
    /// Directory of raw frames.
    RawFrames,
    /// Directory of frames with skeletons drawn.
    OverlayFrames,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Csv(format) => write!(f, "csv_{format}"),
            Self::OverlayVideo => f.write_str("overlay_video"),
            Self::OverlayImage => f.write_str("overlay_image"),
            Self::FrameOverlays => f.write_str("frame_overlays"),
            Self::RawFrames => f.write_str("raw_frames"),
            Self::OverlayFrames => f.write_str("overlay_frames"),
        }
    }
}

/// Outcome of one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// Written; `size` is in bytes (summed over files for directories).
    Produced {
        /// File or directory path.
        path: PathBuf,
        /// Size in bytes.
        size: u64,
    },
    /// Attempted and failed.
    Failed {
        /// Error message.
        error: String,
    },
    /// Not attempted.
    Skipped {
        /// Why the artifact was not produced.
        reason: String,
    },
}

impl ArtifactStatus {
    fn produced(path: PathBuf) -> Self {
        let size = path_size(&path);
        Self::Produced { path, size }
    }

    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Path of a produced artifact.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Produced { path, .. } => Some(path),
            Self::Failed { .. } | Self::Skipped { .. } => None,
        }
    }
}

/// Outcome of a full export run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    /// Artifacts in the order they were attempted.
    pub artifacts: Vec<(ArtifactKind, ArtifactStatus)>,
    /// Effect of validity filtering on the input poses.
    pub filtering: FilteringSummary,
}

impl ExportSummary {
    /// Artifact kind to output path, `None` for artifacts that were not produced.
    #[must_use]
    pub fn paths(&self) -> BTreeMap<ArtifactKind, Option<PathBuf>> {
        self.artifacts
            .iter()
            .map(|(kind, status)| (*kind, status.path().map(Path::to_path_buf)))
            .collect()
    }

    /// Produced artifacts.
    pub fn produced(&self) -> impl Iterator<Item = (ArtifactKind, &Path)> {
        self.artifacts
            .iter()
            .filter_map(|(kind, status)| status.path().map(|p| (*kind, p)))
    }

    /// Failed artifacts with their errors.
    pub fn failed(&self) -> impl Iterator<Item = (ArtifactKind, &str)> {
        self.artifacts.iter().filter_map(|(kind, status)| match status {
            ArtifactStatus::Failed { error } => Some((*kind, error.as_str())),
            _ => None,
        })
    }

    /// Status of one artifact.
    #[must_use]
    pub fn status(&self, kind: ArtifactKind) -> Option<&ArtifactStatus> {
        self.artifacts
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, status)| status)
    }

    /// Total size of produced artifacts in bytes.
    #[must_use]
    pub fn total_size_bytes(&self) -> u64 {
        self.artifacts
            .iter()
            .map(|(_, status)| match status {
                ArtifactStatus::Produced { size, .. } => *size,
                _ => 0,
            })
            .sum()
    }
}

/// What to export.
pub struct ExportRequest<'a> {
    /// Source video or image.
    pub input_file: &'a Path,
    /// Poses as detected, before filtering.
    pub poses: &'a [Pose],
    /// Joint confidence threshold for filtering.
    pub confidence_threshold: f32,
    /// Confident joints needed for a valid pose.
    pub min_valid_joints: usize,
    /// Write CSV tables.
    pub include_csv: bool,
    /// CSV layouts to write.
    pub csv_formats: Vec<CsvFormat>,
    /// Add metadata columns to CSV tables.
    pub include_metadata: bool,
    /// Write an overlay video (video inputs only).
    pub include_video: bool,
    /// Overlay video settings; defaults when unset.
    pub overlay_config: Option<&'a OverlayConfig>,
    /// Write an overlay image (image inputs only).
    pub include_image_overlay: bool,
    /// Write frame images with skeletons drawn (video inputs only).
    pub include_frames: bool,
    /// Directory of those frame images; `<output stem>_frames` when unset.
    pub frames_directory: Option<&'a Path>,
    /// Half-open frame range of those frame images; all frames when unset.
    pub frame_range: Option<(usize, usize)>,
    /// Extract raw and overlay frame directories (video inputs only).
    pub include_comprehensive_frames: bool,
    /// Frame extraction settings; defaults next to the output when unset.
    pub frame_config: Option<&'a FrameExtractionConfig>,
    /// Video I/O backend.
    pub backend: &'a dyn VideoBackend,
}

impl<'a> ExportRequest<'a> {
    /// JSON and normalized CSV with default thresholds.
    #[must_use]
    pub fn new(input_file: &'a Path, poses: &'a [Pose], backend: &'a dyn VideoBackend) -> Self {
        Self {
            input_file,
            poses,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            min_valid_joints: DEFAULT_MIN_VALID_JOINTS,
            include_csv: true,
            csv_formats: vec![CsvFormat::Normalized],
            include_metadata: true,
            include_video: false,
            overlay_config: None,
            include_image_overlay: false,
            include_frames: false,
            frames_directory: None,
            frame_range: None,
            include_comprehensive_frames: false,
            frame_config: None,
            backend,
        }
    }

    /// Set the filtering thresholds.
    #[must_use]
    pub const fn with_thresholds(
        mut self,
        confidence_threshold: f32,
        min_valid_joints: usize,
    ) -> Self {
        self.confidence_threshold = confidence_threshold;
        self.min_valid_joints = min_valid_joints;
        self
    }

    /// Set the CSV layouts; an empty list disables CSV.
    #[must_use]
    pub fn with_csv_formats(mut self, formats: Vec<CsvFormat>) -> Self {
        self.include_csv = !formats.is_empty();
        self.csv_formats = formats;
        self
    }

    /// Request an overlay video.
    #[must_use]
    pub const fn with_overlay_video(mut self, config: Option<&'a OverlayConfig>) -> Self {
        self.include_video = true;
        self.overlay_config = config;
        self
    }

    /// Request an overlay image.
    #[must_use]
    pub const fn with_overlay_image(mut self) -> Self {
        self.include_image_overlay = true;
        self
    }

    /// Request frame images with skeletons drawn.
    #[must_use]
    pub const fn with_frame_overlays(
        mut self,
        directory: Option<&'a Path>,
        frame_range: Option<(usize, usize)>,
    ) -> Self {
        self.include_frames = true;
        self.frames_directory = directory;
        self.frame_range = frame_range;
        self
    }

    /// Request raw and overlay frame directories.
    #[must_use]
    pub const fn with_comprehensive_frames(
        mut self,
        config: Option<&'a FrameExtractionConfig>,
    ) -> Self {
        self.include_comprehensive_frames = true;
        self.frame_config = config;
        self
    }
}

/// Writes all artifacts of a run next to one output path.
#[derive(Debug, Clone)]
pub struct OutputManager {
    output_path: PathBuf,
}

impl OutputManager {
    /// Create a manager for the JSON output path; other artifacts are named after it.
    #[must_use]
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    /// JSON output path.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Overlay video path, kept distinct from the input and the JSON output.
    #[must_use]
    pub fn overlay_video_path(&self, input: &Path) -> PathBuf {
        let path = self.output_path.with_extension("mp4");
        if path == input || path == self.output_path {
            with_stem_suffix(&self.output_path, "_overlay", "mp4")
        } else {
            path
        }
    }

    /// Overlay image path, in the input's image format.
    #[must_use]
    pub fn overlay_image_path(&self, input: &Path) -> PathBuf {
        let extension = input
            .extension()
            .map_or_else(|| "jpg".to_string(), |e| e.to_string_lossy().to_lowercase());
        with_stem_suffix(&self.output_path, "_overlay", &extension)
    }

    /// Default directory of frame overlay images: `<output stem>_frames`.
    #[must_use]
    pub fn frames_directory(&self) -> PathBuf {
        let stem = self
            .output_path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().to_string());
        self.output_path.with_file_name(format!("{stem}_frames"))
    }

    /// Write every requested artifact.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ArtifactError`] if the JSON document cannot be written. Failures of
    /// other artifacts are recorded in the summary instead.
    pub fn export_all_formats(&self, request: &ExportRequest<'_>) -> Result<ExportSummary> {
        section!("Exporting results");

        let filtering = get_filtering_summary(
            request.poses,
            request.confidence_threshold,
            request.min_valid_joints,
        );
        info!(
            "Pose filtering: {} of {} poses kept ({:.1}%), {} of {} frames with poses",
            filtering.valid_total,
            filtering.original_total,
            filtering.pose_retention_rate(),
            filtering.frames_with_poses_after,
            filtering.frames_with_poses_before
        );
        let poses = filter_poses_by_validity(
            request.poses,
            request.confidence_threshold,
            request.min_valid_joints,
        );

        let mut artifacts = Vec::new();
        self.write_json(request, &poses, &filtering)?;
        artifacts.push((
            ArtifactKind::Json,
            ArtifactStatus::produced(self.output_path.clone()),
        ));
        success!("Saved poses to {}", self.output_path.display());

        if request.include_csv {
            for format in &request.csv_formats {
                let path = csv_path_for(&self.output_path, *format);
                let status = export_poses(&poses, &path, *format, request.include_metadata)
                    .map(|_| path);
                artifacts.push(record(ArtifactKind::Csv(*format), status));
            }
        }

        let media = MediaKind::from_path(request.input_file);

        if request.include_video {
            let status = if media == Some(MediaKind::Video) {
                record_status(self.write_overlay_video(request, &poses))
            } else {
                ArtifactStatus::skipped("input is not a video")
            };
            log_status(ArtifactKind::OverlayVideo, &status);
            artifacts.push((ArtifactKind::OverlayVideo, status));
        }

        if request.include_image_overlay {
            let status = if media == Some(MediaKind::Image) {
                let path = self.overlay_image_path(request.input_file);
                let style = request
                    .overlay_config
                    .map(|c| c.style().clone())
                    .unwrap_or_default();
                record_status(
                    annotate_image_file(
                        request.input_file,
                        &poses,
                        &path,
                        &style,
                        request.confidence_threshold,
                    )
                    .map(|()| path),
                )
            } else {
                ArtifactStatus::skipped("input is not an image")
            };
            log_status(ArtifactKind::OverlayImage, &status);
            artifacts.push((ArtifactKind::OverlayImage, status));
        }

        if request.include_frames {
            let status = if media == Some(MediaKind::Video) {
                match self.write_frame_overlays(request, &poses) {
                    Ok(outcome) => phase_status(outcome),
                    Err(e) => ArtifactStatus::Failed {
                        error: e.to_string(),
                    },
                }
            } else {
                ArtifactStatus::skipped("input is not a video")
            };
            log_status(ArtifactKind::FrameOverlays, &status);
            artifacts.push((ArtifactKind::FrameOverlays, status));
        }

        if request.include_comprehensive_frames {
            if media == Some(MediaKind::Video) {
                artifacts.extend(self.extract_frames(request, &poses));
            } else {
                for kind in [ArtifactKind::RawFrames, ArtifactKind::OverlayFrames] {
                    let status = ArtifactStatus::skipped("input is not a video");
                    log_status(kind, &status);
                    artifacts.push((kind, status));
                }
            }
        }

        let summary = ExportSummary {
            artifacts,
            filtering,
        };
        let failed = summary.failed().count();
        if failed > 0 {
            error!("{failed} artifact(s) failed");
        }
        Ok(summary)
    }

    fn write_json(
        &self,
        request: &ExportRequest<'_>,
        poses: &[Pose],
        filtering: &FilteringSummary,
    ) -> Result<()> {
        let to_artifact_error = |e: PoseError| {
            PoseError::ArtifactError(format!(
                "Failed to write {}: {e}",
                self.output_path.display()
            ))
        };
        let filtering = serde_json::to_value(filtering)
            .map_err(|e| to_artifact_error(PoseError::from(e)))?;
        let metadata = JsonMetadata::new(request.input_file.display().to_string(), poses.len())
            .with_info("tool", format!("{} {}", crate::NAME, crate::VERSION))
            .with_info("confidence_threshold", f64::from(request.confidence_threshold))
            .with_info("min_valid_joints", request.min_valid_joints)
            .with_info("filtering", filtering);
        export_json(poses, &self.output_path, &metadata).map_err(to_artifact_error)
    }

    fn write_overlay_video(&self, request: &ExportRequest<'_>, poses: &[Pose]) -> Result<PathBuf> {
        let config = overlay_config(request)?;
        let path = self.overlay_video_path(request.input_file);
        let report = VideoOverlayGenerator::new(&config, request.backend).generate_overlay_video(
            request.input_file,
            poses,
            &path,
            None,
        )?;
        verbose!(
            "Overlay video: {} frames, {} annotated, {} draw failures",
            report.frames_written,
            report.frames_annotated,
            report.draw_failures
        );
        Ok(report.output_path)
    }

    fn write_frame_overlays(
        &self,
        request: &ExportRequest<'_>,
        poses: &[Pose],
    ) -> Result<PhaseOutcome> {
        let config = overlay_config(request)?;
        let directory = request
            .frames_directory
            .map_or_else(|| self.frames_directory(), Path::to_path_buf);
        VideoOverlayGenerator::new(&config, request.backend).generate_frame_overlays(
            request.input_file,
            poses,
            &directory,
            request.frame_range,
            None,
        )
    }

    fn extract_frames(
        &self,
        request: &ExportRequest<'_>,
        poses: &[Pose],
    ) -> Vec<(ArtifactKind, ArtifactStatus)> {
        let default_config;
        let config = if let Some(config) = request.frame_config {
            config
        } else {
            let base = self
                .output_path
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            match FrameExtractionSettings::new()
                .with_base_output_directory(base)
                .with_confidence_threshold(request.confidence_threshold)
                .with_min_valid_joints(request.min_valid_joints)
                .build()
            {
                Ok(config) => {
                    default_config = config;
                    &default_config
                }
                Err(e) => {
                    let status = ArtifactStatus::Failed {
                        error: e.to_string(),
                    };
                    return vec![
                        (ArtifactKind::RawFrames, status.clone()),
                        (ArtifactKind::OverlayFrames, status),
                    ];
                }
            }
        };

        let mut manager = FrameExtractionManager::new(config, request.backend);
        let results = match manager.extract_all_frame_types(request.input_file, poses, None) {
            Ok(results) => results,
            Err(e) => {
                let status = ArtifactStatus::Failed {
                    error: e.to_string(),
                };
                log_status(ArtifactKind::RawFrames, &status);
                log_status(ArtifactKind::OverlayFrames, &status);
                return vec![
                    (ArtifactKind::RawFrames, status.clone()),
                    (ArtifactKind::OverlayFrames, status),
                ];
            }
        };

        [
            (ArtifactKind::RawFrames, results.raw),
            (ArtifactKind::OverlayFrames, results.overlay),
        ]
        .into_iter()
        .map(|(kind, outcome)| {
            let status = phase_status(outcome);
            log_status(kind, &status);
            (kind, status)
        })
        .collect()
    }
}

/// Overlay settings of a request, or defaults at the request's threshold.
fn overlay_config(request: &ExportRequest<'_>) -> Result<OverlayConfig> {
    match request.overlay_config {
        Some(config) => Ok(config.clone()),
        None => OverlaySettings::new()
            .with_confidence_threshold(request.confidence_threshold)
            .build(),
    }
}

fn phase_status(outcome: PhaseOutcome) -> ArtifactStatus {
    match outcome {
        PhaseOutcome::Completed(report) => ArtifactStatus::Produced {
            size: report.written.iter().map(|p| path_size(p)).sum(),
            path: report.directory,
        },
        PhaseOutcome::Disabled => ArtifactStatus::skipped("disabled in configuration"),
        PhaseOutcome::Failed {
            error,
            report: Some(report),
        } => ArtifactStatus::Failed {
            error: format!(
                "{error} ({} frames written to {})",
                report.frames_written,
                report.directory.display()
            ),
        },
        PhaseOutcome::Failed {
            error,
            report: None,
        } => ArtifactStatus::Failed { error },
        PhaseOutcome::Cancelled(report) => ArtifactStatus::Failed {
            error: format!("cancelled after {} frames", report.frames_written),
        },
    }
}

fn record(kind: ArtifactKind, result: Result<PathBuf>) -> (ArtifactKind, ArtifactStatus) {
    let status = record_status(result);
    log_status(kind, &status);
    (kind, status)
}

fn record_status(result: Result<PathBuf>) -> ArtifactStatus {
    match result {
        Ok(path) => ArtifactStatus::produced(path),
        Err(e) => ArtifactStatus::Failed {
            error: e.to_string(),
        },
    }
}

fn log_status(kind: ArtifactKind, status: &ArtifactStatus) {
    match status {
        ArtifactStatus::Produced { path, .. } => success!("Saved {kind} to {}", path.display()),
        ArtifactStatus::Failed { error } => error!("Failed to export {kind}: {error}"),
        ArtifactStatus::Skipped { reason } => verbose!("Skipped {kind}: {reason}"),
    }
}

/// Size of a file, or of the files directly inside a directory.
fn path_size(path: &Path) -> u64 {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => fs::read_dir(path)
            .map(|entries| {
                entries
                    .filter_map(std::result::Result::ok)
                    .filter_map(|entry| entry.metadata().ok())
                    .filter(fs::Metadata::is_file)
                    .map(|meta| meta.len())
                    .sum()
            })
            .unwrap_or(0),
        Ok(meta) => meta.len(),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Joint, KeyPoint};
    use crate::source::FfmpegBackend;

    fn pose(frame: usize, confidence: f32) -> Pose {
        Pose::from_joints(
            0,
            frame,
            0.0,
            vec![Joint::new("nose", 0, KeyPoint::new(1.0, 2.0, confidence))],
        )
    }

    #[test]
    fn test_overlay_paths() {
        let manager = OutputManager::new("out/result.json");
        assert_eq!(
            manager.overlay_video_path(Path::new("in/clip.mp4")),
            PathBuf::from("out/result.mp4")
        );
        assert_eq!(
            manager.overlay_video_path(Path::new("out/result.mp4")),
            PathBuf::from("out/result_overlay.mp4")
        );
        assert_eq!(
            manager.overlay_image_path(Path::new("photo.PNG")),
            PathBuf::from("out/result_overlay.png")
        );
        assert_eq!(manager.frames_directory(), PathBuf::from("out/result_frames"));
        // A JSON output that already ends in .mp4 is never overwritten.
        assert_eq!(
            OutputManager::new("result.mp4").overlay_video_path(Path::new("in.mp4")),
            PathBuf::from("result_overlay.mp4")
        );
    }

    #[test]
    fn test_json_and_csv_with_skipped_video() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("result.json");
        let poses = vec![pose(0, 0.9), pose(1, 0.01)];
        let backend = FfmpegBackend;

        let request = ExportRequest::new(Path::new("photo.jpg"), &poses, &backend)
            .with_csv_formats(vec![CsvFormat::Normalized, CsvFormat::Summary])
            .with_overlay_video(None);
        let summary = OutputManager::new(&output).export_all_formats(&request).unwrap();

        assert_eq!(summary.filtering.removed_total, 1);
        let paths = summary.paths();
        assert_eq!(paths[&ArtifactKind::Json], Some(output.clone()));
        assert_eq!(
            paths[&ArtifactKind::Csv(CsvFormat::Summary)],
            Some(dir.path().join("result_summary.csv"))
        );
        assert!(matches!(
            summary.status(ArtifactKind::OverlayVideo),
            Some(ArtifactStatus::Skipped { .. })
        ));
        assert_eq!(summary.failed().count(), 0);
        assert!(summary.total_size_bytes() > 0);

        let loaded = crate::export::load_poses(&output).unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_json_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the JSON file should go.
        let output = dir.path().join("result.json");
        fs::create_dir(&output).unwrap();
        let backend = FfmpegBackend;
        let request = ExportRequest::new(Path::new("clip.mp4"), &[], &backend);

        let err = OutputManager::new(&output).export_all_formats(&request);
        assert!(matches!(err, Err(PoseError::ArtifactError(_))));
        assert!(!dir.path().join("result.csv").exists());
    }

    #[test]
    fn test_missing_image_overlay_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("result.json");
        let poses = vec![pose(0, 0.9)];
        let backend = FfmpegBackend;
        let request = ExportRequest::new(Path::new("/nonexistent/photo.jpg"), &poses, &backend)
            .with_overlay_image();

        let summary = OutputManager::new(&output).export_all_formats(&request).unwrap();
        assert_eq!(summary.produced().count(), 2);
        let failed: Vec<_> = summary.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, ArtifactKind::OverlayImage);
    }
}
