// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Joint topologies of the supported pose models.
//!
//! A topology fixes the joint count, the name of each joint id and the skeleton edges drawn
//! between joints.

use std::fmt;
use std::str::FromStr;

use crate::error::PoseError;
use crate::pose::Pose;
use crate::visualizer::skeleton::{BODY_25_SKELETON, COCO_SKELETON, MPI_15_SKELETON};

/// COCO 17-keypoint joint names, indexed by joint id.
pub const COCO_JOINT_NAMES: [&str; 17] = [
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
];

/// BODY-25 joint names, indexed by joint id.
pub const BODY_25_JOINT_NAMES: [&str; 25] = [
    "nose",
    "neck",
    "right_shoulder",
    "right_elbow",
    "right_wrist",
    "left_shoulder",
    "left_elbow",
    "left_wrist",
    "mid_hip",
    "right_hip",
    "right_knee",
    "right_ankle",
    "left_hip",
    "left_knee",
    "left_ankle",
    "right_eye",
    "left_eye",
    "right_ear",
    "left_ear",
    "left_big_toe",
    "left_small_toe",
    "left_heel",
    "right_big_toe",
    "right_small_toe",
    "right_heel",
];

/// MPI 15-keypoint joint names, indexed by joint id.
pub const MPI_15_JOINT_NAMES: [&str; 15] = [
    "head",
    "neck",
    "right_shoulder",
    "right_elbow",
    "right_wrist",
    "left_shoulder",
    "left_elbow",
    "left_wrist",
    "right_hip",
    "right_knee",
    "right_ankle",
    "left_hip",
    "left_knee",
    "left_ankle",
    "chest",
];

/// Skeleton definition of a pose model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    /// COCO 17 keypoints.
    #[default]
    Coco17,
    /// `OpenPose` BODY-25.
    Body25,
    /// MPI 15 keypoints.
    Mpi15,
}

impl Topology {
    /// All supported topologies, in inference preference order.
    pub const ALL: [Self; 3] = [Self::Coco17, Self::Body25, Self::Mpi15];

    /// Joint names indexed by joint id.
    #[must_use]
    pub const fn joint_names(self) -> &'static [&'static str] {
        match self {
            Self::Coco17 => &COCO_JOINT_NAMES,
            Self::Body25 => &BODY_25_JOINT_NAMES,
            Self::Mpi15 => &MPI_15_JOINT_NAMES,
        }
    }

    /// Skeleton edges as pairs of joint ids.
    #[must_use]
    pub const fn edges(self) -> &'static [[u32; 2]] {
        match self {
            Self::Coco17 => &COCO_SKELETON,
            Self::Body25 => &BODY_25_SKELETON,
            Self::Mpi15 => &MPI_15_SKELETON,
        }
    }

    /// Number of joints.
    #[must_use]
    pub const fn joint_count(self) -> usize {
        self.joint_names().len()
    }

    /// Name of a joint id, if it exists in this topology.
    #[must_use]
    pub fn joint_name(self, joint_id: u32) -> Option<&'static str> {
        self.joint_names().get(joint_id as usize).copied()
    }

    /// Joint id for a name.
    #[must_use]
    pub fn joint_id(self, name: &str) -> Option<u32> {
        self.joint_names()
            .iter()
            .position(|n| *n == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    /// Check that every joint of the pose carries this topology's name for its id.
    #[must_use]
    pub fn matches(self, pose: &Pose) -> bool {
        pose.joints
            .iter()
            .all(|j| self.joint_name(j.joint_id) == Some(j.name.as_str()))
    }

    /// Find the first topology consistent with the pose's (id, name) pairs.
    #[must_use]
    pub fn infer(pose: &Pose) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.matches(pose))
    }

    /// Get string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coco17 => "coco17",
            Self::Body25 => "body25",
            Self::Mpi15 => "mpi15",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Topology {
    type Err = PoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "coco" | "coco17" => Ok(Self::Coco17),
            "body25" => Ok(Self::Body25),
            "mpi" | "mpi15" => Ok(Self::Mpi15),
            _ => Err(PoseError::ConfigError(format!("Unknown topology: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Joint, KeyPoint};

    #[test]
    fn test_edges_reference_valid_ids() {
        for topology in Topology::ALL {
            let count = topology.joint_count();
            for [a, b] in topology.edges() {
                assert!((*a as usize) < count && (*b as usize) < count, "{topology}");
            }
        }
    }

    #[test]
    fn test_infer_by_id_and_name() {
        let kp = KeyPoint::new(0.0, 0.0, 1.0);
        let coco = Pose::from_joints(0, 0, 0.0, vec![Joint::new("left_eye", 1, kp)]);
        assert_eq!(Topology::infer(&coco), Some(Topology::Coco17));

        let body = Pose::from_joints(0, 0, 0.0, vec![Joint::new("left_eye", 16, kp)]);
        assert_eq!(Topology::infer(&body), Some(Topology::Body25));

        let mpi = Pose::from_joints(0, 0, 0.0, vec![Joint::new("chest", 14, kp)]);
        assert_eq!(Topology::infer(&mpi), Some(Topology::Mpi15));

        let unknown = Pose::from_joints(0, 0, 0.0, vec![Joint::new("tail", 3, kp)]);
        assert_eq!(Topology::infer(&unknown), None);
    }

    #[test]
    fn test_topology_from_str() {
        assert_eq!("BODY_25".parse::<Topology>().unwrap(), Topology::Body25);
        assert_eq!("coco".parse::<Topology>().unwrap(), Topology::Coco17);
        assert!("hand".parse::<Topology>().is_err());
    }
}
