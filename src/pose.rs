// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose data model.
//!
//! A [`Pose`] is one detected person in one frame: a list of named [`Joint`]s, each wrapping a
//! [`KeyPoint`] position with a confidence score. Poses are produced once per detection call
//! and never mutated afterwards; filtering and grouping build new collections.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{PoseError, Result};

/// 2D pixel position with a confidence score in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    /// Horizontal pixel coordinate.
    pub x: f32,
    /// Vertical pixel coordinate.
    pub y: f32,
    /// Detection confidence.
    pub confidence: f32,
}

impl KeyPoint {
    /// Create a new keypoint.
    #[must_use]
    pub const fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }
}

/// A named anatomical point of a pose topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Joint name, e.g. `left_wrist`.
    pub name: String,
    /// Index of the joint in its topology.
    pub joint_id: u32,
    /// Position and confidence.
    pub keypoint: KeyPoint,
}

impl Joint {
    /// Create a new joint.
    #[must_use]
    pub fn new(name: impl Into<String>, joint_id: u32, keypoint: KeyPoint) -> Self {
        Self {
            name: name.into(),
            joint_id,
            keypoint,
        }
    }

    /// Confidence of the wrapped keypoint.
    #[must_use]
    pub const fn confidence(&self) -> f32 {
        self.keypoint.confidence
    }
}

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum x.
    pub min_x: f32,
    /// Minimum y.
    pub min_y: f32,
    /// Maximum x.
    pub max_x: f32,
    /// Maximum y.
    pub max_y: f32,
}

/// One detected person in one frame or image.
///
/// `person_id` is only unique within a frame; no identity is carried across frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Index of the person within its frame.
    pub person_id: u32,
    /// Source frame number (0 for still images).
    pub frame_number: usize,
    /// Seconds from the start of the video (0.0 for still images).
    pub timestamp: f64,
    /// Aggregate pose confidence.
    pub confidence: f32,
    /// Joints ordered by `joint_id`.
    pub joints: Vec<Joint>,
}

impl Pose {
    /// Create a pose with an explicit aggregate confidence.
    #[must_use]
    pub const fn new(
        person_id: u32,
        frame_number: usize,
        timestamp: f64,
        confidence: f32,
        joints: Vec<Joint>,
    ) -> Self {
        Self {
            person_id,
            frame_number,
            timestamp,
            confidence,
            joints,
        }
    }

    /// Create a pose whose confidence is the mean of its joint confidences.
    ///
    /// Joints are sorted by `joint_id`.
    #[must_use]
    pub fn from_joints(
        person_id: u32,
        frame_number: usize,
        timestamp: f64,
        mut joints: Vec<Joint>,
    ) -> Self {
        joints.sort_by_key(|j| j.joint_id);
        let confidence = mean_confidence(&joints).unwrap_or(0.0);
        Self::new(person_id, frame_number, timestamp, confidence, joints)
    }

    /// Number of joints.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Look up a joint by name.
    #[must_use]
    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|j| j.name == name)
    }

    /// Look up a joint by topology index.
    #[must_use]
    pub fn joint_by_id(&self, joint_id: u32) -> Option<&Joint> {
        self.joints.iter().find(|j| j.joint_id == joint_id)
    }

    /// Joints whose confidence is at least `threshold`.
    pub fn confident_joints(&self, threshold: f32) -> impl Iterator<Item = &Joint> {
        self.joints
            .iter()
            .filter(move |j| j.confidence() >= threshold)
    }

    /// Bounding box over joints with confidence strictly above zero.
    ///
    /// Returns `None` when no joint was detected.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.joints
            .iter()
            .filter(|j| j.confidence() > 0.0)
            .fold(None, |acc: Option<BoundingBox>, j| {
                let (x, y) = (j.keypoint.x, j.keypoint.y);
                Some(match acc {
                    None => BoundingBox {
                        min_x: x,
                        min_y: y,
                        max_x: x,
                        max_y: y,
                    },
                    Some(b) => BoundingBox {
                        min_x: b.min_x.min(x),
                        min_y: b.min_y.min(y),
                        max_x: b.max_x.max(x),
                        max_y: b.max_y.max(y),
                    },
                })
            })
    }

    /// Check that the pose is well-formed.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ValidationError`] for non-finite values, confidences outside
    /// `[0, 1]`, or duplicate joint ids.
    pub fn validate(&self) -> Result<()> {
        let invalid = |what: String| {
            PoseError::ValidationError(format!(
                "pose (frame {}, person {}): {what}",
                self.frame_number, self.person_id
            ))
        };

        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(invalid(format!("invalid timestamp {}", self.timestamp)));
        }
        if !self.confidence.is_finite() {
            return Err(invalid("non-finite pose confidence".to_string()));
        }

        let mut seen = HashSet::with_capacity(self.joints.len());
        for joint in &self.joints {
            let kp = joint.keypoint;
            if !kp.x.is_finite() || !kp.y.is_finite() {
                return Err(invalid(format!("joint '{}' has non-finite position", joint.name)));
            }
            if !(0.0..=1.0).contains(&kp.confidence) {
                return Err(invalid(format!(
                    "joint '{}' confidence {} outside [0, 1]",
                    joint.name, kp.confidence
                )));
            }
            if !seen.insert(joint.joint_id) {
                return Err(invalid(format!("duplicate joint id {}", joint.joint_id)));
            }
        }
        Ok(())
    }
}

/// Mean confidence of a joint list, `None` if empty.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn mean_confidence(joints: &[Joint]) -> Option<f32> {
    if joints.is_empty() {
        return None;
    }
    let sum: f32 = joints.iter().map(Joint::confidence).sum();
    Some(sum / joints.len() as f32)
}

/// Index poses by frame number in a single pass.
///
/// Poses keep their relative order within each frame.
#[must_use]
pub fn group_by_frame(poses: &[Pose]) -> BTreeMap<usize, Vec<&Pose>> {
    let mut frames: BTreeMap<usize, Vec<&Pose>> = BTreeMap::new();
    for pose in poses {
        frames.entry(pose.frame_number).or_default().push(pose);
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joint(name: &str, id: u32, x: f32, y: f32, conf: f32) -> Joint {
        Joint::new(name, id, KeyPoint::new(x, y, conf))
    }

    #[test]
    fn test_from_joints_mean_and_order() {
        let pose = Pose::from_joints(
            0,
            3,
            0.1,
            vec![joint("left_eye", 1, 0.0, 0.0, 0.4), joint("nose", 0, 1.0, 1.0, 0.8)],
        );
        assert_eq!(pose.joints[0].name, "nose");
        assert!((pose.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_bounding_box_ignores_zero_confidence() {
        let pose = Pose::from_joints(
            0,
            0,
            0.0,
            vec![
                joint("nose", 0, 10.0, 20.0, 0.9),
                joint("left_eye", 1, 500.0, 500.0, 0.0),
                joint("right_eye", 2, 30.0, 5.0, 0.3),
            ],
        );
        let bbox = pose.bounding_box().unwrap();
        assert!((bbox.min_x - 10.0).abs() < f32::EPSILON);
        assert!((bbox.max_x - 30.0).abs() < f32::EPSILON);
        assert!((bbox.min_y - 5.0).abs() < f32::EPSILON);
        assert!((bbox.max_y - 20.0).abs() < f32::EPSILON);

        let empty = Pose::from_joints(0, 0, 0.0, vec![joint("nose", 0, 1.0, 1.0, 0.0)]);
        assert!(empty.bounding_box().is_none());
    }

    #[test]
    fn test_validate_rejects_malformed() {
        let ok = Pose::from_joints(0, 0, 0.0, vec![joint("nose", 0, 1.0, 1.0, 0.5)]);
        assert!(ok.validate().is_ok());

        let nan = Pose::from_joints(0, 0, 0.0, vec![joint("nose", 0, f32::NAN, 1.0, 0.5)]);
        assert!(matches!(nan.validate(), Err(PoseError::ValidationError(_))));

        let conf = Pose::from_joints(0, 0, 0.0, vec![joint("nose", 0, 1.0, 1.0, 1.5)]);
        assert!(conf.validate().is_err());

        let dup = Pose::new(
            0,
            0,
            0.0,
            0.5,
            vec![joint("nose", 0, 1.0, 1.0, 0.5), joint("nose", 0, 2.0, 2.0, 0.5)],
        );
        assert!(dup.validate().is_err());
    }

    #[test]
    fn test_group_by_frame() {
        let poses = vec![
            Pose::from_joints(0, 5, 0.0, vec![]),
            Pose::from_joints(0, 2, 0.0, vec![]),
            Pose::from_joints(1, 5, 0.0, vec![]),
        ];
        let grouped = group_by_frame(&poses);
        assert_eq!(grouped.keys().copied().collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(grouped[&5].len(), 2);
        assert_eq!(grouped[&5][1].person_id, 1);
    }

    #[test]
    fn test_json_shape() {
        let pose = Pose::from_joints(2, 4, 0.5, vec![joint("nose", 0, 1.0, 2.0, 0.5)]);
        let value = serde_json::to_value(&pose).unwrap();
        assert_eq!(value["person_id"], 2);
        assert_eq!(value["joints"][0]["keypoint"]["x"], 1.0);
        assert_eq!(value["joints"][0]["joint_id"], 0);
    }
}
