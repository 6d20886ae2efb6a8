// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! JSON export and reload of pose results.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PoseError, Result};
use crate::pose::Pose;

/// Run-level metadata stored alongside the poses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonMetadata {
    /// Input video or image path.
    pub input_file: String,
    /// RFC 3339 generation time.
    pub output_generated_at: String,
    /// Number of poses in the document.
    pub total_poses_detected: usize,
    /// Free-form processing details (thresholds, filtering summary, tool version).
    #[serde(default)]
    pub processing_info: serde_json::Map<String, serde_json::Value>,
}

impl JsonMetadata {
    /// Create metadata stamped with the current local time.
    #[must_use]
    pub fn new(input_file: impl Into<String>, total_poses_detected: usize) -> Self {
        Self {
            input_file: input_file.into(),
            output_generated_at: chrono::Local::now().to_rfc3339(),
            total_poses_detected,
            processing_info: serde_json::Map::new(),
        }
    }

    /// Add a processing detail.
    #[must_use]
    pub fn with_info(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.processing_info.insert(key.into(), value.into());
        self
    }
}

/// Aggregate counts over a pose list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    /// Number of poses.
    pub total_poses: usize,
    /// Highest frame number plus one, 0 without poses.
    pub total_frames: usize,
    /// Distinct person ids.
    pub people_detected: usize,
    /// Distinct frames with at least one pose.
    pub frames_with_poses: usize,
    /// `total_poses / frames_with_poses`.
    pub average_poses_per_frame: f64,
}

impl ResultsSummary {
    /// Summarize a pose list.
    #[must_use]
    pub fn from_poses(poses: &[Pose]) -> Self {
        let frames: BTreeSet<usize> = poses.iter().map(|p| p.frame_number).collect();
        let people: BTreeSet<u32> = poses.iter().map(|p| p.person_id).collect();
        #[allow(clippy::cast_precision_loss)]
        let average_poses_per_frame = if frames.is_empty() {
            0.0
        } else {
            poses.len() as f64 / frames.len() as f64
        };

        Self {
            total_poses: poses.len(),
            total_frames: frames.last().map_or(0, |max| max + 1),
            people_detected: people.len(),
            frames_with_poses: frames.len(),
            average_poses_per_frame,
        }
    }
}

/// Complete JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseDocument {
    /// Run metadata.
    pub metadata: JsonMetadata,
    /// Aggregate counts.
    pub summary: ResultsSummary,
    /// Every pose of the run.
    pub poses: Vec<Pose>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PoseFile {
    Document { poses: Vec<Pose> },
    List(Vec<Pose>),
}

/// Write poses with metadata and summary as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be created or serialization fails.
pub fn export_json(poses: &[Pose], output_path: &Path, metadata: &JsonMetadata) -> Result<()> {
    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let document = PoseDocument {
        metadata: metadata.clone(),
        summary: ResultsSummary::from_poses(poses),
        poses: poses.to_vec(),
    };

    let file = File::create(output_path).map_err(|e| {
        PoseError::IoError(format!("Failed to create {}: {e}", output_path.display()))
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writer.flush()?;

    crate::verbose!(
        "Exported {} poses to {}",
        poses.len(),
        output_path.display()
    );
    Ok(())
}

/// Load poses from a JSON document or a bare pose array.
///
/// # Errors
///
/// Returns [`PoseError::InputError`] if the file cannot be read, [`PoseError::JsonError`] if
/// it cannot be parsed, and [`PoseError::ValidationError`] for malformed poses.
pub fn load_poses(path: &Path) -> Result<Vec<Pose>> {
    let file = File::open(path).map_err(|e| {
        PoseError::InputError(format!("Failed to open pose file {}: {e}", path.display()))
    })?;
    let parsed: PoseFile = serde_json::from_reader(BufReader::new(file))?;
    let poses = match parsed {
        PoseFile::Document { poses } | PoseFile::List(poses) => poses,
    };
    for pose in &poses {
        pose.validate()?;
    }
    Ok(poses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Joint, KeyPoint};

    fn sample() -> Vec<Pose> {
        let joint = |conf| vec![Joint::new("nose", 0, KeyPoint::new(1.0, 2.0, conf))];
        vec![
            Pose::from_joints(0, 0, 0.0, joint(0.9)),
            Pose::from_joints(1, 0, 0.0, joint(0.8)),
            Pose::from_joints(0, 4, 0.2, joint(0.7)),
        ]
    }

    #[test]
    fn test_results_summary() {
        let summary = ResultsSummary::from_poses(&sample());
        assert_eq!(summary.total_poses, 3);
        assert_eq!(summary.total_frames, 5);
        assert_eq!(summary.people_detected, 2);
        assert_eq!(summary.frames_with_poses, 2);
        assert!((summary.average_poses_per_frame - 1.5).abs() < f64::EPSILON);

        let empty = ResultsSummary::from_poses(&[]);
        assert_eq!(empty.total_frames, 0);
    }

    #[test]
    fn test_export_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/pose.json");
        let poses = sample();
        let metadata = JsonMetadata::new("clip.mp4", poses.len()).with_info("threshold", 0.1);

        export_json(&poses, &path, &metadata).unwrap();

        let value: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["metadata"]["input_file"], "clip.mp4");
        assert_eq!(value["summary"]["total_poses"], 3);
        assert_eq!(value["poses"][2]["frame_number"], 4);

        assert_eq!(load_poses(&path).unwrap(), poses);
    }

    #[test]
    fn test_load_bare_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poses.json");
        fs::write(&path, serde_json::to_string(&sample()).unwrap()).unwrap();
        assert_eq!(load_poses(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_load_missing_field_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poses.json");
        fs::write(&path, r#"[{"person_id": 0, "joints": []}]"#).unwrap();
        assert!(matches!(load_poses(&path), Err(PoseError::JsonError(_))));

        assert!(matches!(
            load_poses(&dir.path().join("missing.json")),
            Err(PoseError::InputError(_))
        ));
    }
}
