// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CSV export in three layouts.
//!
//! | Format | Rows | Columns |
//! |--------|------|---------|
//! | [`CsvFormat::Normalized`] | one per (pose, joint) | frame, person, joint, position, confidence |
//! | [`CsvFormat::Wide`] | one per pose | `{joint}_x`, `{joint}_y`, `{joint}_confidence` groups |
//! | [`CsvFormat::Summary`] | one per pose | joint statistics and bounding box |
//!
//! Rows are streamed to the output; an empty pose list produces a header-only file.

use std::collections::BTreeSet;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PoseError, Result};
use crate::pose::Pose;

/// Tabular layout of a CSV export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CsvFormat {
    /// One row per joint.
    Normalized,
    /// One row per pose with flattened joint columns.
    Wide,
    /// One row per pose with aggregate statistics.
    Summary,
}

impl CsvFormat {
    /// All formats.
    pub const ALL: [Self; 3] = [Self::Normalized, Self::Wide, Self::Summary];

    /// Get string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normalized => "normalized",
            Self::Wide => "wide",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for CsvFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CsvFormat {
    type Err = PoseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "normalized" | "long" => Ok(Self::Normalized),
            "wide" => Ok(Self::Wide),
            "summary" => Ok(Self::Summary),
            _ => Err(PoseError::ConfigError(format!(
                "Unknown CSV format '{s}'. Valid formats: normalized, wide, summary"
            ))),
        }
    }
}

/// Path of the CSV file for a format, derived from the run's output path.
///
/// The normalized layout gets `{stem}.csv`, the others `{stem}_{format}.csv`.
#[must_use]
pub fn csv_path_for(output_path: &Path, format: CsvFormat) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map_or_else(|| "poses".to_string(), |s| s.to_string_lossy().to_string());
    let name = match format {
        CsvFormat::Normalized => format!("{stem}.csv"),
        other => format!("{stem}_{other}.csv"),
    };
    output_path.with_file_name(name)
}

/// Export poses to a CSV file.
///
/// All poses are validated before the file is created.
///
/// # Arguments
///
/// * `poses` - Poses to export, already filtered.
/// * `output_path` - Destination file. Parent directories are created.
/// * `format` - Column layout.
/// * `include_metadata` - Add pose-level metadata columns.
///
/// # Returns
///
/// Number of data rows written.
///
/// # Errors
///
/// Returns [`PoseError::ValidationError`] for malformed poses and an IO or CSV error when the
/// file cannot be written.
pub fn export_poses(
    poses: &[Pose],
    output_path: &Path,
    format: CsvFormat,
    include_metadata: bool,
) -> Result<usize> {
    for pose in poses {
        pose.validate()?;
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            PoseError::IoError(format!(
                "Failed to create directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    let file = File::create(output_path).map_err(|e| {
        PoseError::IoError(format!("Failed to create {}: {e}", output_path.display()))
    })?;

    let rows = write_poses(poses, file, format, include_metadata)?;
    crate::verbose!(
        "Exported {rows} {format} CSV rows to {}",
        output_path.display()
    );
    Ok(rows)
}

/// Write poses as CSV into any writer.
///
/// Poses are not validated here; see [`export_poses`].
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_poses<W: Write>(
    poses: &[Pose],
    writer: W,
    format: CsvFormat,
    include_metadata: bool,
) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    let rows = match format {
        CsvFormat::Normalized => write_normalized(&mut csv, poses, include_metadata)?,
        CsvFormat::Wide => write_wide(&mut csv, poses, include_metadata)?,
        CsvFormat::Summary => write_summary(&mut csv, poses, include_metadata)?,
    };
    csv.flush()?;
    Ok(rows)
}

fn write_normalized<W: Write>(
    csv: &mut csv::Writer<W>,
    poses: &[Pose],
    include_metadata: bool,
) -> Result<usize> {
    let mut header = vec![
        "frame_number",
        "timestamp",
        "person_id",
        "joint_name",
        "joint_id",
        "x",
        "y",
        "confidence",
    ];
    if include_metadata {
        header.extend(["pose_confidence", "total_joints"]);
    }
    csv.write_record(&header)?;

    let mut rows = 0;
    for pose in poses {
        for joint in &pose.joints {
            let mut record = vec![
                pose.frame_number.to_string(),
                pose.timestamp.to_string(),
                pose.person_id.to_string(),
                joint.name.clone(),
                joint.joint_id.to_string(),
                joint.keypoint.x.to_string(),
                joint.keypoint.y.to_string(),
                joint.keypoint.confidence.to_string(),
            ];
            if include_metadata {
                record.push(pose.confidence.to_string());
                record.push(pose.joint_count().to_string());
            }
            csv.write_record(&record)?;
            rows += 1;
        }
    }
    Ok(rows)
}

fn write_wide<W: Write>(
    csv: &mut csv::Writer<W>,
    poses: &[Pose],
    include_metadata: bool,
) -> Result<usize> {
    // Union of joints across poses, ordered by joint id.
    let columns: BTreeSet<(u32, &str)> = poses
        .iter()
        .flat_map(|p| p.joints.iter().map(|j| (j.joint_id, j.name.as_str())))
        .collect();

    let mut header: Vec<String> = ["frame_number", "timestamp", "person_id"]
        .iter()
        .map(ToString::to_string)
        .collect();
    if include_metadata {
        header.push("pose_confidence".to_string());
        header.push("total_joints".to_string());
    }
    for (_, name) in &columns {
        header.push(format!("{name}_x"));
        header.push(format!("{name}_y"));
        header.push(format!("{name}_confidence"));
    }
    csv.write_record(&header)?;

    for pose in poses {
        let mut record = vec![
            pose.frame_number.to_string(),
            pose.timestamp.to_string(),
            pose.person_id.to_string(),
        ];
        if include_metadata {
            record.push(pose.confidence.to_string());
            record.push(pose.joint_count().to_string());
        }
        for (joint_id, name) in &columns {
            match pose
                .joints
                .iter()
                .find(|j| j.joint_id == *joint_id && j.name == *name)
            {
                Some(joint) => {
                    record.push(joint.keypoint.x.to_string());
                    record.push(joint.keypoint.y.to_string());
                    record.push(joint.keypoint.confidence.to_string());
                }
                None => record.extend([String::new(), String::new(), String::new()]),
            }
        }
        csv.write_record(&record)?;
    }
    Ok(poses.len())
}

fn write_summary<W: Write>(
    csv: &mut csv::Writer<W>,
    poses: &[Pose],
    include_metadata: bool,
) -> Result<usize> {
    let mut header = vec![
        "frame_number",
        "timestamp",
        "person_id",
        "total_joints",
        "valid_joints",
        "avg_confidence",
        "max_confidence",
        "min_confidence",
        "pose_confidence",
    ];
    if include_metadata {
        header.extend(["bbox_min_x", "bbox_min_y", "bbox_max_x", "bbox_max_y"]);
    }
    csv.write_record(&header)?;

    for pose in poses {
        let confidences = pose.joints.iter().map(|j| j.confidence());
        let valid_joints = pose.joints.iter().filter(|j| j.confidence() > 0.0).count();
        let optional = |v: Option<f32>| v.map_or_else(String::new, |v| v.to_string());

        let mut record = vec![
            pose.frame_number.to_string(),
            pose.timestamp.to_string(),
            pose.person_id.to_string(),
            pose.joint_count().to_string(),
            valid_joints.to_string(),
            optional(crate::pose::mean_confidence(&pose.joints)),
            optional(confidences.clone().reduce(f32::max)),
            optional(confidences.reduce(f32::min)),
            pose.confidence.to_string(),
        ];
        if include_metadata {
            match pose.bounding_box() {
                Some(b) => record.extend([
                    b.min_x.to_string(),
                    b.min_y.to_string(),
                    b.max_x.to_string(),
                    b.max_y.to_string(),
                ]),
                None => record.extend(std::iter::repeat_n(String::new(), 4)),
            }
        }
        csv.write_record(&record)?;
    }
    Ok(poses.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Joint, KeyPoint};

    fn pose(frame: usize, person: u32, joints: &[(&str, u32, f32)]) -> Pose {
        let joints = joints
            .iter()
            .map(|&(name, id, conf)| Joint::new(name, id, KeyPoint::new(10.0, 20.0, conf)))
            .collect();
        Pose::from_joints(person, frame, 0.5, joints)
    }

    fn render(poses: &[Pose], format: CsvFormat, include_metadata: bool) -> Vec<Vec<String>> {
        let mut buf = Vec::new();
        write_poses(poses, &mut buf, format, include_metadata).unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(buf.as_slice());
        reader
            .records()
            .map(|r| r.unwrap().iter().map(ToString::to_string).collect())
            .collect()
    }

    #[test]
    fn test_empty_input_writes_header_only() {
        for format in CsvFormat::ALL {
            let rows = render(&[], format, true);
            assert_eq!(rows.len(), 1, "{format}");
            assert_eq!(rows[0][0], "frame_number");
        }
    }

    #[test]
    fn test_normalized_rows_per_joint() {
        let poses = vec![pose(0, 0, &[("nose", 0, 0.05), ("left_eye", 1, 0.5)])];
        let rows = render(&poses, CsvFormat::Normalized, true);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 10);
        assert_eq!(rows[1][3], "nose");
        assert_eq!(rows[2][4], "1");
        assert_eq!(rows[2][9], "2");

        let rows = render(&poses, CsvFormat::Normalized, false);
        assert_eq!(rows[0].len(), 8);
    }

    #[test]
    fn test_wide_columns_follow_joint_id_order() {
        let poses = vec![
            pose(0, 0, &[("right_eye", 2, 0.5)]),
            pose(0, 1, &[("nose", 0, 0.9), ("right_eye", 2, 0.4)]),
        ];
        let rows = render(&poses, CsvFormat::Wide, false);
        assert_eq!(
            rows[0],
            vec![
                "frame_number",
                "timestamp",
                "person_id",
                "nose_x",
                "nose_y",
                "nose_confidence",
                "right_eye_x",
                "right_eye_y",
                "right_eye_confidence"
            ]
        );
        assert_eq!(rows.len(), 3);
        // First pose has no nose: empty cells.
        assert_eq!(rows[1][3], "");
        assert_eq!(rows[1][6], "10");
    }

    #[test]
    fn test_summary_statistics_and_bbox() {
        let poses = vec![
            pose(3, 1, &[("nose", 0, 0.2), ("left_eye", 1, 0.6)]),
            pose(4, 0, &[("nose", 0, 0.0)]),
        ];
        let rows = render(&poses, CsvFormat::Summary, true);
        assert_eq!(rows.len(), 3);
        let first = &rows[1];
        assert_eq!(first[0], "3");
        assert_eq!(first[3], "2");
        assert_eq!(first[4], "2");
        assert_eq!(first[6], "0.6");
        assert_eq!(first[9], "10");

        // No joint above zero confidence: bbox cells are empty.
        let second = &rows[2];
        assert_eq!(second[4], "0");
        assert!(second[9..].iter().all(String::is_empty));
    }

    #[test]
    fn test_normalized_row_counts_match_summary_joint_counts() {
        let poses = vec![
            pose(0, 0, &[("nose", 0, 0.5), ("left_eye", 1, 0.5)]),
            pose(0, 1, &[("nose", 0, 0.5)]),
            pose(1, 0, &[("nose", 0, 0.5), ("left_eye", 1, 0.5), ("right_eye", 2, 0.3)]),
        ];
        let normalized = render(&poses, CsvFormat::Normalized, false);
        let summary = render(&poses, CsvFormat::Summary, false);

        for row in &summary[1..] {
            let count = normalized[1..]
                .iter()
                .filter(|r| r[0] == row[0] && r[2] == row[2])
                .count();
            assert_eq!(count.to_string(), row[3]);
        }
        assert_eq!(normalized.len() - 1, 6);
    }

    #[test]
    fn test_non_ascii_names_survive() {
        let poses = vec![pose(0, 0, &[("épaule_gauche", 5, 0.5)])];
        let rows = render(&poses, CsvFormat::Normalized, false);
        assert_eq!(rows[1][3], "épaule_gauche");
    }

    #[test]
    fn test_export_rejects_malformed_pose() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        let poses = vec![pose(0, 0, &[("nose", 0, 2.0)])];
        let err = export_poses(&poses, &path, CsvFormat::Normalized, true).unwrap_err();
        assert!(matches!(err, PoseError::ValidationError(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_csv_path_for() {
        let out = Path::new("outputs/pose.json");
        assert_eq!(
            csv_path_for(out, CsvFormat::Normalized),
            PathBuf::from("outputs/pose.csv")
        );
        assert_eq!(
            csv_path_for(out, CsvFormat::Summary),
            PathBuf::from("outputs/pose_summary.csv")
        );
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("WIDE".parse::<CsvFormat>().unwrap(), CsvFormat::Wide);
        assert!("xml".parse::<CsvFormat>().is_err());
    }
}
