// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for exporting poses.
//!
//! This module contains the command-line interface logic, including argument parsing,
//! console logging, and the `export` and `info` command implementations.

// Modules
/// CLI arguments.
pub mod args;

/// Export command.
pub mod export;

/// Info command.
pub mod info;

/// Logging macros.
pub mod logging;
