// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::{Path, PathBuf};

use crate::cli::args::ExportArgs;
use crate::cli::logging::set_verbose;
use crate::config::{FrameExtractionConfig, FrameExtractionSettings, OverlaySettings};
use crate::error::{PoseError, Result};
use crate::export::{CsvFormat, load_poses};
use crate::filter::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MIN_VALID_JOINTS};
use crate::output::{ExportRequest, OutputManager};
use crate::source::{FfmpegBackend, MediaKind, validate_input_file};
use crate::{VERSION, info, section, success, verbose, warn};

/// Parse a `start:end` frame range.
///
/// # Errors
///
/// Returns [`PoseError::ConfigError`] if the value is malformed.
pub fn parse_frame_range(value: &str) -> Result<(usize, usize)> {
    let invalid = || {
        PoseError::ConfigError(format!(
            "Invalid frame range '{value}', expected start:end"
        ))
    };
    let (start, end) = value.split_once(':').ok_or_else(invalid)?;
    let start = start.trim().parse().map_err(|_| invalid())?;
    let end = end.trim().parse().map_err(|_| invalid())?;
    Ok((start, end))
}

/// Parse CSV format names, dropping duplicates.
///
/// # Errors
///
/// Returns [`PoseError::ConfigError`] for an unknown format.
pub fn parse_csv_formats(names: &[String]) -> Result<Vec<CsvFormat>> {
    let mut formats = Vec::with_capacity(names.len());
    for name in names {
        let format: CsvFormat = name.parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

/// Default output path: `outputs/<input stem>.json`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    PathBuf::from("outputs").join(format!("{}.json", crate::source::video_name(input)))
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

/// Frame extraction config of `--extract-comprehensive-frames`, with CLI flags over file values.
fn comprehensive_frame_config(
    args: &ExportArgs,
    frame_range: Option<(usize, usize)>,
) -> Result<Option<FrameExtractionConfig>> {
    if !args.extract_comprehensive_frames {
        return Ok(None);
    }
    let mut settings = match &args.frame_extraction_config {
        Some(path) => FrameExtractionSettings::from_json_file(path)?,
        None => FrameExtractionSettings::new(),
    };
    if let Some(threshold) = args.confidence_threshold {
        settings.confidence_threshold = threshold;
    }
    if let Some(count) = args.min_valid_joints {
        settings.min_valid_joints = count;
    }
    if frame_range.is_some() {
        settings.frame_range = frame_range;
    }
    if let Some(skip) = args.frame_skip {
        settings.frame_skip = skip;
    }
    if let Some(dir) = &args.frames_directory {
        settings.base_output_directory.clone_from(dir);
    }
    if args.valid_frames_only {
        settings.raw.valid_frames_only = true;
    }
    settings.build().map(Some)
}

/// Run the export command.
///
/// # Errors
///
/// Returns an error if the input, poses or configuration are invalid, or if the JSON document
/// cannot be written.
pub fn run_export(args: &ExportArgs) -> Result<()> {
    set_verbose(args.verbose);
    section!("posedetect {VERSION}");

    let media = validate_input_file(&args.input)?;
    let poses = load_poses(&args.poses)?;
    info!(
        "Loaded {} poses from {}",
        poses.len(),
        args.poses.display()
    );

    let csv_formats = if args.no_csv {
        Vec::new()
    } else {
        parse_csv_formats(&args.csv_formats)?
    };
    let confidence_threshold = args
        .confidence_threshold
        .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);
    let min_valid_joints = args.min_valid_joints.unwrap_or(DEFAULT_MIN_VALID_JOINTS);

    let mut overlay_settings = match &args.overlay_config {
        Some(path) => OverlaySettings::from_json_file(path)?,
        None => OverlaySettings::new(),
    };
    if let Some(threshold) = args.confidence_threshold {
        overlay_settings.confidence_threshold = threshold;
    }
    let overlay_config = overlay_settings.build()?;

    let frame_range = args
        .frame_range
        .as_deref()
        .map(parse_frame_range)
        .transpose()?;

    let frame_config = comprehensive_frame_config(args, frame_range)?;

    let wants_frames = args.extract_frames || args.extract_comprehensive_frames;
    if media == MediaKind::Image && (args.overlay_video || wants_frames) {
        warn!("Overlay video and frame extraction need a video input; skipping them");
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));
    verbose!("Output: {}", output.display());

    let backend = FfmpegBackend;
    let request = ExportRequest {
        input_file: &args.input,
        poses: &poses,
        confidence_threshold,
        min_valid_joints,
        include_csv: !csv_formats.is_empty(),
        csv_formats,
        include_metadata: !args.no_metadata,
        include_video: args.overlay_video,
        overlay_config: Some(&overlay_config),
        include_image_overlay: args.overlay_image,
        include_frames: args.extract_frames,
        frames_directory: args.frames_directory.as_deref(),
        frame_range,
        include_comprehensive_frames: args.extract_comprehensive_frames,
        frame_config: frame_config.as_ref(),
        backend: &backend,
    };

    let summary = OutputManager::new(output).export_all_formats(&request)?;

    let produced = summary.produced().count();
    let failed = summary.failed().count();
    if failed == 0 {
        success!(
            "Exported {produced} artifacts ({})",
            format_size(summary.total_size_bytes())
        );
    } else {
        warn!(
            "Exported {produced} artifacts ({}), {failed} failed",
            format_size(summary.total_size_bytes())
        );
    }
    Ok(())
}
