// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::collections::BTreeSet;

/// What happens to a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    /// Outside the configured frame range.
    OutOfRange,
    /// Not on the frame stride.
    Stride,
    /// Considered, but no valid pose in the frame.
    Invalid,
    /// Write this frame.
    Extract,
}

/// The set of frames a stream extracts.
///
/// Frames are narrowed in order: range, then stride on the absolute index, then valid frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    range: Option<(usize, usize)>,
    skip: usize,
    valid: Option<BTreeSet<usize>>,
}

impl FramePlan {
    /// Plan over a half-open range with a stride. A zero stride is treated as 1.
    #[must_use]
    pub fn new(range: Option<(usize, usize)>, skip: usize) -> Self {
        Self {
            range,
            skip: skip.max(1),
            valid: None,
        }
    }

    /// Restrict the plan to frames containing a valid pose.
    #[must_use]
    pub fn with_valid_frames(mut self, frames: BTreeSet<usize>) -> Self {
        self.valid = Some(frames);
        self
    }

    /// Whether the plan is restricted to valid frames.
    #[must_use]
    pub const fn valid_only(&self) -> bool {
        self.valid.is_some()
    }

    /// Decide what to do with frame `index`.
    #[must_use]
    pub fn decide(&self, index: usize) -> FrameDecision {
        if let Some((start, end)) = self.range
            && (index < start || index >= end)
        {
            return FrameDecision::OutOfRange;
        }
        if index % self.skip != 0 {
            return FrameDecision::Stride;
        }
        match &self.valid {
            Some(valid) if !valid.contains(&index) => FrameDecision::Invalid,
            _ => FrameDecision::Extract,
        }
    }

    /// No frame at or after `index` can be extracted.
    #[must_use]
    pub fn is_past_end(&self, index: usize) -> bool {
        if let Some((_, end)) = self.range
            && index >= end
        {
            return true;
        }
        self.valid
            .as_ref()
            .is_some_and(|valid| valid.last().is_none_or(|last| index > *last))
    }

    /// Number of frames the plan extracts from a video of `total_frames` frames.
    #[must_use]
    pub fn effective_count(&self, total_frames: usize) -> usize {
        let (start, end) = self.range.map_or((0, total_frames), |(s, e)| (s, e.min(total_frames)));
        if start >= end {
            return 0;
        }
        match &self.valid {
            Some(valid) => valid
                .range(start..end)
                .filter(|i| *i % self.skip == 0)
                .count(),
            None => (start..end).filter(|i| i % self.skip == 0).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_then_stride() {
        let plan = FramePlan::new(Some((3, 10)), 2);
        assert_eq!(plan.decide(2), FrameDecision::OutOfRange);
        assert_eq!(plan.decide(3), FrameDecision::Stride);
        assert_eq!(plan.decide(4), FrameDecision::Extract);
        assert_eq!(plan.decide(10), FrameDecision::OutOfRange);
        assert_eq!(plan.effective_count(100), 3);
    }

    #[test]
    fn test_valid_frames_after_stride() {
        let plan = FramePlan::new(None, 2).with_valid_frames(BTreeSet::from([2, 5, 7, 8]));
        assert_eq!(plan.decide(2), FrameDecision::Extract);
        // Frame 5 is valid but off-stride.
        assert_eq!(plan.decide(5), FrameDecision::Stride);
        assert_eq!(plan.decide(4), FrameDecision::Invalid);
        assert_eq!(plan.effective_count(10), 2);
    }

    #[test]
    fn test_past_end() {
        let plan = FramePlan::new(None, 1).with_valid_frames(BTreeSet::from([2, 5]));
        assert!(!plan.is_past_end(5));
        assert!(plan.is_past_end(6));
        assert!(FramePlan::new(None, 1).with_valid_frames(BTreeSet::new()).is_past_end(0));
        assert!(FramePlan::new(Some((0, 4)), 1).is_past_end(4));
        assert!(!FramePlan::new(None, 1).is_past_end(1_000_000));
    }

    #[test]
    fn test_zero_skip_is_every_frame() {
        let plan = FramePlan::new(None, 0);
        assert_eq!(plan.decide(7), FrameDecision::Extract);
        assert_eq!(plan.effective_count(5), 5);
    }
}
