// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Adapter between a pose estimation engine and [`Pose`] records.
//!
//! The engine itself is out of scope: anything implementing [`PoseDetector`] can feed the
//! pipeline. Engine failures surface as [`PoseError::DetectionError`].

use std::path::Path;

use image::DynamicImage;

use crate::error::{PoseError, Result};
use crate::pose::{Joint, KeyPoint, Pose};
use crate::source::{VideoBackend, load_image};
use crate::topology::Topology;
use crate::{verbose, warn};

/// One keypoint as reported by an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedJoint {
    /// Joint name.
    pub name: String,
    /// Joint id within the engine's topology.
    pub joint_id: u32,
    /// X coordinate in pixels.
    pub x: f32,
    /// Y coordinate in pixels.
    pub y: f32,
    /// Detection confidence; 0.0 means not detected.
    pub confidence: f32,
}

/// One person as reported by an engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectedPerson {
    /// Reported joints.
    pub joints: Vec<DetectedJoint>,
}

impl DetectedPerson {
    /// Build a person from `[x, y, confidence]` rows in a topology's joint order.
    ///
    /// Rows beyond the topology's joint count are ignored.
    #[must_use]
    pub fn from_keypoints(topology: Topology, keypoints: &[[f32; 3]]) -> Self {
        let joints = topology
            .joint_names()
            .iter()
            .zip(keypoints)
            .zip(0u32..)
            .map(|((name, [x, y, confidence]), joint_id)| DetectedJoint {
                name: (*name).to_string(),
                joint_id,
                x: *x,
                y: *y,
                confidence: *confidence,
            })
            .collect();
        Self { joints }
    }

    /// Convert into a pose, dropping undetected joints.
    ///
    /// Returns `None` when no joint was detected.
    #[must_use]
    pub fn into_pose(self, person_id: u32, frame_number: usize, timestamp: f64) -> Option<Pose> {
        let joints: Vec<Joint> = self
            .joints
            .into_iter()
            .filter(|j| j.confidence > 0.0)
            .map(|j| Joint::new(j.name, j.joint_id, KeyPoint::new(j.x, j.y, j.confidence)))
            .collect();
        if joints.is_empty() {
            return None;
        }
        Some(Pose::from_joints(person_id, frame_number, timestamp, joints))
    }
}

/// A pose estimation engine.
pub trait PoseDetector {
    /// Detect people in one image.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails on this image.
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<DetectedPerson>>;
}

fn detection_error(context: &str, e: PoseError) -> PoseError {
    match e {
        PoseError::DetectionError(_) => e,
        _ => PoseError::DetectionError(format!("{context}: {e}")),
    }
}

fn frame_poses(people: Vec<DetectedPerson>, frame_number: usize, timestamp: f64) -> Vec<Pose> {
    people
        .into_iter()
        .zip(0u32..)
        .filter_map(|(person, person_id)| person.into_pose(person_id, frame_number, timestamp))
        .collect()
}

/// Detect poses in a still image (frame 0, timestamp 0.0).
///
/// # Errors
///
/// Returns [`PoseError::InputError`] if the image cannot be loaded and
/// [`PoseError::DetectionError`] if the engine fails.
pub fn detect_poses_in_image(detector: &mut dyn PoseDetector, path: &Path) -> Result<Vec<Pose>> {
    let image = load_image(path)?;
    let people = detector
        .detect(&image)
        .map_err(|e| detection_error(&path.display().to_string(), e))?;
    let poses = frame_poses(people, 0, 0.0);
    verbose!("Detected {} poses in {}", poses.len(), path.display());
    Ok(poses)
}

/// Detect poses in every frame of a video.
///
/// Timestamps are `frame / fps`; person ids are the detection index within each frame.
///
/// # Errors
///
/// Returns [`PoseError::InputError`] if the video cannot be opened and
/// [`PoseError::DetectionError`] if the engine fails on any frame.
pub fn detect_poses_in_video(
    detector: &mut dyn PoseDetector,
    backend: &dyn VideoBackend,
    path: &Path,
) -> Result<Vec<Pose>> {
    let mut reader = backend.open(path)?;
    let fps = f64::from(reader.info().fps);
    if fps <= 0.0 {
        warn!("Video {} reports no frame rate; timestamps will be 0", path.display());
    }

    let mut poses = Vec::new();
    for (index, frame) in reader.by_ref().enumerate() {
        let frame = frame?;
        let people = detector
            .detect(&frame)
            .map_err(|e| detection_error(&format!("frame {index}"), e))?;
        #[allow(clippy::cast_precision_loss)]
        let timestamp = if fps > 0.0 { index as f64 / fps } else { 0.0 };
        poses.extend(frame_poses(people, index, timestamp));
    }

    verbose!("Detected {} poses in {}", poses.len(), path.display());
    Ok(poses)
}
