// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose validity filtering.
//!
//! A pose is *valid* when at least `min_valid_joints` of its joints reach the confidence
//! threshold. The filter runs once per export run; every downstream consumer receives the
//! already-filtered poses.

use std::collections::{BTreeMap, BTreeSet};

use crate::pose::Pose;
use crate::verbose;

/// Default minimum joint confidence for a joint to count as detected.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.1;

/// Default number of confident joints a pose needs to be valid.
pub const DEFAULT_MIN_VALID_JOINTS: usize = 1;

/// Check whether a pose has enough confident joints.
///
/// A pose without joints is never valid.
#[must_use]
pub fn has_valid_pose(pose: &Pose, confidence_threshold: f32, min_valid_joints: usize) -> bool {
    if pose.joints.is_empty() {
        return false;
    }
    pose.confident_joints(confidence_threshold).count() >= min_valid_joints
}

/// Keep only valid poses, preserving their relative order.
#[must_use]
pub fn filter_poses_by_validity(
    poses: &[Pose],
    confidence_threshold: f32,
    min_valid_joints: usize,
) -> Vec<Pose> {
    let valid: Vec<Pose> = poses
        .iter()
        .filter(|p| has_valid_pose(p, confidence_threshold, min_valid_joints))
        .cloned()
        .collect();

    let removed = poses.len() - valid.len();
    if removed > 0 {
        #[allow(clippy::cast_precision_loss)]
        let pct = removed as f64 / poses.len() as f64 * 100.0;
        verbose!(
            "Pose filtering: {} original, {} valid, {removed} removed ({pct:.1}%)",
            poses.len(),
            valid.len()
        );
    }
    valid
}

/// Frame numbers that contain at least one valid pose.
#[must_use]
pub fn get_frames_with_valid_poses(
    poses: &[Pose],
    confidence_threshold: f32,
    min_valid_joints: usize,
) -> BTreeSet<usize> {
    poses
        .iter()
        .filter(|p| has_valid_pose(p, confidence_threshold, min_valid_joints))
        .map(|p| p.frame_number)
        .collect()
}

/// Group valid poses by frame number.
///
/// Frames without any valid pose are absent from the map rather than mapped to an empty list.
#[must_use]
pub fn group_poses_by_frame_filtered(
    poses: &[Pose],
    confidence_threshold: f32,
    min_valid_joints: usize,
) -> BTreeMap<usize, Vec<Pose>> {
    let mut frames: BTreeMap<usize, Vec<Pose>> = BTreeMap::new();
    for pose in poses
        .iter()
        .filter(|p| has_valid_pose(p, confidence_threshold, min_valid_joints))
    {
        frames
            .entry(pose.frame_number)
            .or_default()
            .push(pose.clone());
    }
    frames
}

/// Counts describing the effect of validity filtering.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct FilteringSummary {
    /// Poses before filtering.
    pub original_total: usize,
    /// Poses that passed.
    pub valid_total: usize,
    /// Poses removed.
    pub removed_total: usize,
    /// `removed_total / original_total`, 0.0 for an empty input.
    pub removal_fraction: f64,
    /// Distinct frames with any pose.
    pub frames_with_poses_before: usize,
    /// Distinct frames with a valid pose.
    pub frames_with_poses_after: usize,
}

impl FilteringSummary {
    /// Percentage of poses kept.
    #[must_use]
    pub fn pose_retention_rate(&self) -> f64 {
        if self.original_total == 0 {
            return 0.0;
        }
        (1.0 - self.removal_fraction) * 100.0
    }

    /// Percentage of frames that still have poses after filtering.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn frame_retention_rate(&self) -> f64 {
        if self.frames_with_poses_before == 0 {
            return 0.0;
        }
        self.frames_with_poses_after as f64 / self.frames_with_poses_before as f64 * 100.0
    }
}

/// Summarize what filtering would do to a pose list.
#[must_use]
pub fn get_filtering_summary(
    poses: &[Pose],
    confidence_threshold: f32,
    min_valid_joints: usize,
) -> FilteringSummary {
    let original_total = poses.len();
    let valid_total = poses
        .iter()
        .filter(|p| has_valid_pose(p, confidence_threshold, min_valid_joints))
        .count();
    let removed_total = original_total - valid_total;
    #[allow(clippy::cast_precision_loss)]
    let removal_fraction = if original_total == 0 {
        0.0
    } else {
        removed_total as f64 / original_total as f64
    };

    let frames_before: BTreeSet<usize> = poses.iter().map(|p| p.frame_number).collect();
    let frames_after = get_frames_with_valid_poses(poses, confidence_threshold, min_valid_joints);

    FilteringSummary {
        original_total,
        valid_total,
        removed_total,
        removal_fraction,
        frames_with_poses_before: frames_before.len(),
        frames_with_poses_after: frames_after.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Joint, KeyPoint};

    fn pose(frame: usize, person: u32, confidences: &[f32]) -> Pose {
        let joints = confidences
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let id = u32::try_from(i).unwrap();
                Joint::new(format!("j{i}"), id, KeyPoint::new(1.0, 1.0, c))
            })
            .collect();
        Pose::from_joints(person, frame, 0.0, joints)
    }

    #[test]
    fn test_one_confident_joint_is_enough() {
        let p = pose(0, 0, &[0.05, 0.5]);
        assert!(has_valid_pose(&p, 0.1, 1));
        assert!(!has_valid_pose(&p, 0.1, 2));
        assert!(has_valid_pose(&p, 0.5, 1));
    }

    #[test]
    fn test_empty_pose_is_invalid() {
        let p = pose(0, 0, &[]);
        assert!(!has_valid_pose(&p, 0.0, 0));
    }

    #[test]
    fn test_filter_is_ordered_subsequence_and_idempotent() {
        let poses = vec![
            pose(0, 0, &[0.9]),
            pose(0, 1, &[0.01]),
            pose(1, 0, &[0.2]),
            pose(2, 0, &[0.0, 0.0]),
            pose(3, 0, &[0.1]),
        ];
        let once = filter_poses_by_validity(&poses, 0.1, 1);
        let frames: Vec<usize> = once.iter().map(|p| p.frame_number).collect();
        assert_eq!(frames, vec![0, 1, 3]);
        assert!(once.iter().all(|p| p.confident_joints(0.1).count() >= 1));

        let twice = filter_poses_by_validity(&once, 0.1, 1);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_valid_frames_and_grouping() {
        let poses = vec![
            pose(2, 0, &[0.5]),
            pose(5, 0, &[0.5]),
            pose(5, 1, &[0.5]),
            pose(7, 0, &[0.5]),
            pose(9, 0, &[0.01]),
        ];
        let frames = get_frames_with_valid_poses(&poses, 0.1, 1);
        assert_eq!(frames.into_iter().collect::<Vec<_>>(), vec![2, 5, 7]);

        let grouped = group_poses_by_frame_filtered(&poses, 0.1, 1);
        assert!(!grouped.contains_key(&9));
        assert_eq!(grouped[&5].len(), 2);
    }

    #[test]
    fn test_filtering_summary() {
        let poses = vec![pose(0, 0, &[0.5]), pose(0, 1, &[0.0]), pose(1, 0, &[0.0])];
        let summary = get_filtering_summary(&poses, 0.1, 1);
        assert_eq!(summary.original_total, 3);
        assert_eq!(summary.valid_total, 1);
        assert_eq!(summary.removed_total, 2);
        assert!((summary.removal_fraction - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.frames_with_poses_before, 2);
        assert_eq!(summary.frames_with_poses_after, 1);
        assert!((summary.frame_retention_rate() - 50.0).abs() < 1e-9);

        let empty = get_filtering_summary(&[], 0.1, 1);
        assert!(empty.removal_fraction.abs() < f64::EPSILON);
        assert!(empty.pose_retention_rate().abs() < f64::EPSILON);
    }
}
