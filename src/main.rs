// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use clap::Parser;

use posedetect::cli::args::{Cli, Commands};
use posedetect::cli::export::run_export;
use posedetect::cli::info::run_info;
use posedetect::error;

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Export(args) => run_export(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}
