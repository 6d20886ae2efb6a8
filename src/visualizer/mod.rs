// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Colors and skeleton tables used when drawing poses.

/// Color definitions and palettes.
pub mod color;

/// Skeleton edge tables per topology.
pub mod skeleton;

pub use color::Color;
