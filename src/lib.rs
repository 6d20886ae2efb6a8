// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # posedetect
//!
//! Export, render and extract human pose keypoints detected in videos and images.
//!
//! Given the poses of a video (one record per detected person per frame), the library writes:
//!
//! - **JSON** - the pose document with run metadata and a results summary
//! - **CSV** - normalized (one row per joint), wide (one row per pose) or summary layouts
//! - **Overlay video** - the input video with skeletons drawn on every frame
//! - **Frame directories** - raw frames and skeleton frames as individual images
//!
//! Poses are filtered for validity once per run: a pose is kept when enough of its joints reach
//! the confidence threshold. Every artifact sees the same filtered poses.
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! posedetect = "0.1"
//! ```
//!
//! Video decoding and encoding go through FFmpeg and need the `video` feature:
//!
//! ```bash
//! cargo install posedetect --features video
//! ```
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use std::path::Path;
//!
//! use posedetect::export::{CsvFormat, load_poses};
//! use posedetect::output::{ExportRequest, OutputManager};
//! use posedetect::source::FfmpegBackend;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let poses = load_poses(Path::new("walk_poses.json"))?;
//!     let backend = FfmpegBackend;
//!
//!     let request = ExportRequest::new(Path::new("walk.mp4"), &poses, &backend)
//!         .with_thresholds(0.3, 5)
//!         .with_csv_formats(vec![CsvFormat::Normalized, CsvFormat::Summary])
//!         .with_overlay_video(None);
//!     let summary = OutputManager::new("outputs/walk.json").export_all_formats(&request)?;
//!
//!     for (kind, path) in summary.produced() {
//!         println!("{kind}: {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # JSON and normalized CSV
//! posedetect export walk.mp4 --poses walk_poses.json
//!
//! # All CSV layouts and an overlay video
//! posedetect export walk.mp4 --poses walk_poses.json --csv-format normalized,wide,summary --overlay-video
//!
//! # Raw and overlay frame directories for frames 100..200, every 5th frame
//! posedetect export walk.mp4 --poses walk_poses.json --extract-comprehensive-frames \
//!     --frame-range 100:200 --frame-skip 5
//!
//! # Video properties
//! posedetect info walk.mp4
//! ```
//!
//! **CLI Options:**
//!
//! | Option | Description | Default |
//! |--------|-------------|---------|
//! | `--poses`, `-p` | Pose JSON file | required |
//! | `--output`, `-o` | Output JSON path | `outputs/<input>.json` |
//! | `--confidence-threshold` | Minimum joint confidence | `0.1` |
//! | `--min-valid-joints` | Confident joints per valid pose | `1` |
//! | `--csv-format` | CSV layouts | `normalized` |
//! | `--overlay-video` | Write a skeleton overlay video | `false` |
//! | `--extract-frames` | Write frame images with skeletons drawn | `false` |
//! | `--extract-comprehensive-frames` | Write raw and overlay frames | `false` |
//! | `--frame-range` | Half-open frame range `start:end` | all frames |
//! | `--frame-skip` | Extract every n-th frame | `1` |
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`pose`] | Pose records ([`Pose`], [`Joint`], [`KeyPoint`]) |
//! | [`topology`] | Joint naming schemes and skeleton edges ([`Topology`]) |
//! | [`filter`] | Pose validity filtering |
//! | [`export`] | JSON and CSV writers |
//! | [`config`] | Validated overlay and frame extraction configuration |
//! | [`annotate`] | Skeleton drawing ([`PoseAnnotator`]) |
//! | [`overlay`] | Overlay video generation ([`VideoOverlayGenerator`]) |
//! | [`extraction`] | Frame directories ([`FrameExtractionManager`]) |
//! | [`output`] | Multi-artifact export ([`OutputManager`]) |
//! | [`detector`] | Pose engine adapter ([`PoseDetector`]) |
//! | [`source`] | Input files and the video backend seam |
//! | [`error`] | Error types ([`PoseError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `video` | Video decoding and encoding through FFmpeg |
//!
//! ## License
//!
//! This project is licensed under [AGPL-3.0](https://ultralytics.com/license).

// Modules
pub mod annotate;
pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod export;
pub mod extraction;
pub mod filter;
pub mod io;
pub mod output;
pub mod overlay;
pub mod pose;
pub mod source;
pub mod topology;
pub mod visualizer;

// Re-export main types for convenience
pub use annotate::PoseAnnotator;
pub use config::{
    FrameExtractionConfig, FrameExtractionSettings, OverlayConfig, OverlaySettings,
    VisualizationStyle,
};
pub use detector::{DetectedJoint, DetectedPerson, PoseDetector};
pub use error::{PoseError, Result};
pub use export::CsvFormat;
pub use extraction::{ExtractionResults, FrameExtractionManager, PhaseOutcome};
pub use output::{ArtifactKind, ArtifactStatus, ExportRequest, ExportSummary, OutputManager};
pub use overlay::{OverlayReport, VideoOverlayGenerator};
pub use pose::{Joint, KeyPoint, Pose};
pub use source::{FfmpegBackend, VideoBackend, VideoInfo, VideoReader};
pub use topology::Topology;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        // Version should be semver format like "0.1.0"
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "posedetect");
    }
}
