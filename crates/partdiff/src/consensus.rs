//! Multi-frame consensus: one verdict from N per-frame evaluations.

use serde::{Deserialize, Serialize};

use crate::frame::{FrameClass, FrameResult};

/// Final inspection verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Consensus policy.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Minimum number of clean frames for a pass verdict.
    pub min_clean_frames: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            min_clean_frames: 2,
        }
    }
}

/// Aggregated outcome across all frames of a request.
#[derive(Debug, Clone, Copy)]
pub struct Consensus {
    pub verdict: Verdict,
    /// Index of the representative frame: the one with the most candidate
    /// contours, first occurrence on ties.
    pub representative: usize,
    /// True when any frame raised the operator-dependent signal.
    pub operator_dependent: bool,
}

/// Combine per-frame evaluations into a final verdict.
///
/// Callers guarantee at least one frame.
pub fn aggregate(frames: &[FrameResult], config: &ConsensusConfig) -> Consensus {
    debug_assert!(!frames.is_empty());

    let mut representative = 0usize;
    for (i, f) in frames.iter().enumerate() {
        if f.contour_count > frames[representative].contour_count {
            representative = i;
        }
    }

    let clean = frames
        .iter()
        .filter(|f| f.class == FrameClass::Clean)
        .count();
    let verdict = if clean >= config.min_clean_frames {
        Verdict::Pass
    } else {
        Verdict::Fail
    };
    let operator_dependent = frames.iter().any(|f| f.class.operator_dependent());

    tracing::info!(
        "consensus: {clean}/{} clean frames, verdict {verdict:?}, representative {representative}",
        frames.len()
    );
    Consensus {
        verdict,
        representative,
        operator_dependent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::classify_frame;
    use image::GrayImage;

    fn frame(contour_count: usize, matched_count: usize) -> FrameResult {
        FrameResult {
            mask: GrayImage::new(4, 4),
            contour_count,
            matched_count,
            class: classify_frame(contour_count, matched_count),
        }
    }

    #[test]
    fn all_clean_passes_with_first_frame_representative() {
        let frames = [frame(0, 0), frame(0, 0), frame(0, 0)];
        let c = aggregate(&frames, &ConsensusConfig::default());
        assert_eq!(c.verdict, Verdict::Pass);
        assert!(!c.operator_dependent);
        // Tie on contour count 0: first occurrence wins.
        assert_eq!(c.representative, 0);
    }

    #[test]
    fn two_clean_one_ambiguous_passes_with_flag() {
        let frames = [frame(0, 0), frame(5, 0), frame(0, 0)];
        let c = aggregate(&frames, &ConsensusConfig::default());
        assert_eq!(c.verdict, Verdict::Pass);
        assert!(c.operator_dependent);
        assert_eq!(c.representative, 1);
    }

    #[test]
    fn all_defect_frames_fail_without_flag() {
        let frames = [frame(2, 1), frame(4, 2), frame(3, 1)];
        let c = aggregate(&frames, &ConsensusConfig::default());
        assert_eq!(c.verdict, Verdict::Fail);
        assert!(!c.operator_dependent);
        assert_eq!(c.representative, 1);
    }

    #[test]
    fn one_clean_frame_is_not_enough() {
        let frames = [frame(0, 0), frame(2, 1), frame(3, 1)];
        let c = aggregate(&frames, &ConsensusConfig::default());
        assert_eq!(c.verdict, Verdict::Fail);
    }

    #[test]
    fn representative_tie_breaks_to_first() {
        let frames = [frame(3, 1), frame(3, 1), frame(1, 0)];
        let c = aggregate(&frames, &ConsensusConfig::default());
        assert_eq!(c.representative, 0);
    }
}
