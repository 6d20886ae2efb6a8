// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r"Examples:
    posedetect export walk.mp4 --poses walk_poses.json
    posedetect export walk.mp4 --poses walk_poses.json --csv-format normalized,wide,summary
    posedetect export walk.mp4 --poses walk_poses.json --overlay-video --confidence-threshold 0.3
    posedetect export walk.mp4 --poses walk_poses.json --extract-frames --frame-range 0:100
    posedetect export walk.mp4 --poses walk_poses.json --extract-comprehensive-frames --valid-frames-only
    posedetect export walk.mp4 --poses walk_poses.json --extract-comprehensive-frames --frame-range 100:200 --frame-skip 5
    posedetect export photo.jpg --poses photo_poses.json --overlay-image
    posedetect info walk.mp4")]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export detected poses to JSON, CSV, overlay video and frame directories
    Export(ExportArgs),
    /// Print video properties
    Info(InfoArgs),
}

/// Arguments for the export command.
#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExportArgs {
    /// Input video or image
    pub input: PathBuf,

    /// Pose JSON file (document or bare pose list)
    #[arg(short, long)]
    pub poses: PathBuf,

    /// Output JSON path; other artifacts are named after it [default: outputs/<input>.json]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Minimum joint confidence [default: 0.1]
    #[arg(long)]
    pub confidence_threshold: Option<f32>,

    /// Confident joints a pose needs to be kept [default: 1]
    #[arg(long)]
    pub min_valid_joints: Option<usize>,

    /// CSV layouts to write (normalized, wide, summary)
    #[arg(long = "csv-format", value_delimiter = ',', default_value = "normalized")]
    pub csv_formats: Vec<String>,

    /// Do not write CSV files
    #[arg(long, default_value_t = false)]
    pub no_csv: bool,

    /// Leave metadata columns out of CSV files
    #[arg(long, default_value_t = false)]
    pub no_metadata: bool,

    /// Write a video with skeletons drawn (video inputs)
    #[arg(long, default_value_t = false)]
    pub overlay_video: bool,

    /// Write an image with skeletons drawn (image inputs)
    #[arg(long, default_value_t = false)]
    pub overlay_image: bool,

    /// Write frame images with skeletons drawn (video inputs) [default dir: <output>_frames]
    #[arg(long, default_value_t = false)]
    pub extract_frames: bool,

    /// Extract raw and overlay frames into separate directories
    #[arg(long, default_value_t = false)]
    pub extract_comprehensive_frames: bool,

    /// Only extract raw frames that contain a valid pose (comprehensive extraction)
    #[arg(long, default_value_t = false)]
    pub valid_frames_only: bool,

    /// Half-open frame range to extract, as start:end
    #[arg(long)]
    pub frame_range: Option<String>,

    /// Extract every n-th frame
    #[arg(long)]
    pub frame_skip: Option<usize>,

    /// Directory of --extract-frames images; parent of comprehensive frame directories
    #[arg(long)]
    pub frames_directory: Option<PathBuf>,

    /// Overlay video settings (JSON)
    #[arg(long)]
    pub overlay_config: Option<PathBuf>,

    /// Frame extraction settings (JSON)
    #[arg(long)]
    pub frame_extraction_config: Option<PathBuf>,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

/// Arguments for the info command.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Video file
    pub video: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_args_defaults() {
        let args = Cli::parse_from(["app", "export", "walk.mp4", "--poses", "poses.json"]);
        match args.command {
            Commands::Export(export_args) => {
                assert_eq!(export_args.input, PathBuf::from("walk.mp4"));
                assert_eq!(export_args.poses, PathBuf::from("poses.json"));
                assert_eq!(export_args.csv_formats, vec!["normalized".to_string()]);
                assert!(export_args.output.is_none());
                assert!(export_args.confidence_threshold.is_none());
                assert!(!export_args.overlay_video);
                assert!(export_args.verbose);
            }
            Commands::Info(_) => panic!("expected export"),
        }
    }

    #[test]
    fn test_export_args_custom() {
        let args = Cli::parse_from([
            "app",
            "export",
            "walk.mp4",
            "-p",
            "poses.json",
            "--csv-format",
            "wide,summary",
            "--confidence-threshold",
            "0.3",
            "--frame-range",
            "10:20",
            "--extract-comprehensive-frames",
            "--verbose",
            "false",
        ]);
        match args.command {
            Commands::Export(export_args) => {
                assert_eq!(export_args.csv_formats, vec!["wide", "summary"]);
                assert!((export_args.confidence_threshold.unwrap() - 0.3).abs() < f32::EPSILON);
                assert_eq!(export_args.frame_range.as_deref(), Some("10:20"));
                assert!(export_args.extract_comprehensive_frames);
                assert!(!export_args.verbose);
            }
            Commands::Info(_) => panic!("expected export"),
        }
    }

    #[test]
    fn test_info_args() {
        let args = Cli::parse_from(["app", "info", "walk.mp4"]);
        assert!(matches!(
            args.command,
            Commands::Info(InfoArgs { video }) if video == PathBuf::from("walk.mp4")
        ));
    }
}
