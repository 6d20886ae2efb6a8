// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Tabular and JSON exporters.

pub mod csv;
pub mod json;

pub use self::csv::{CsvFormat, csv_path_for, export_poses};
pub use self::json::{JsonMetadata, PoseDocument, ResultsSummary, export_json, load_poses};
