// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use crate::cli::args::InfoArgs;
use crate::error::Result;
use crate::info;
use crate::source::{FfmpegBackend, video_info};

/// Print the properties of a video.
///
/// # Errors
///
/// Returns [`PoseError::InputError`](crate::PoseError::InputError) if the video cannot be
/// opened.
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let info = video_info(&FfmpegBackend, &args.video)?;
    info!("{}", args.video.display());
    info!("  resolution: {}x{}", info.width, info.height);
    info!("  fps:        {:.2}", info.fps);
    info!("  frames:     {}", info.total_frames);
    info!("  duration:   {:.2}s", info.duration());
    Ok(())
}
