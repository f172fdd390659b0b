//! Per-capture frame evaluation.

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Classification of a single captured frame.
///
/// Exactly one transition from unclassified happens per frame:
/// - no surviving contours at all → `Clean`
/// - unmatched contours only → `Ambiguous`; no heuristic resolves them,
///   so the frame raises the operator-dependent signal for the request
/// - at least one matched contour → `DefectPresent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameClass {
    Clean,
    Ambiguous,
    DefectPresent,
}

/// Outcome of evaluating one captured frame.
#[derive(Debug, Clone)]
pub struct FrameResult {
    /// Cleaned difference mask for this frame.
    pub mask: GrayImage,
    /// Number of surviving candidate contours.
    pub contour_count: usize,
    /// Number of candidate contours matched against master contours.
    pub matched_count: usize,
    pub class: FrameClass,
}

/// Serializable per-frame summary (the mask stays out of the report).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameReport {
    pub contour_count: usize,
    pub matched_count: usize,
    pub class: FrameClass,
}

impl From<&FrameResult> for FrameReport {
    fn from(r: &FrameResult) -> Self {
        Self {
            contour_count: r.contour_count,
            matched_count: r.matched_count,
            class: r.class,
        }
    }
}

/// Classify one frame from its contour counts.
pub fn classify_frame(contour_count: usize, matched_count: usize) -> FrameClass {
    if contour_count == 0 && matched_count == 0 {
        FrameClass::Clean
    } else if matched_count == 0 {
        FrameClass::Ambiguous
    } else {
        FrameClass::DefectPresent
    }
}

impl FrameClass {
    /// Whether this frame requires human judgment downstream.
    pub fn operator_dependent(self) -> bool {
        self == FrameClass::Ambiguous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_contours_is_clean() {
        assert_eq!(classify_frame(0, 0), FrameClass::Clean);
        assert!(!classify_frame(0, 0).operator_dependent());
    }

    #[test]
    fn unmatched_contours_are_ambiguous() {
        assert_eq!(classify_frame(5, 0), FrameClass::Ambiguous);
        assert!(classify_frame(5, 0).operator_dependent());
    }

    #[test]
    fn matched_contours_mean_defect_present() {
        assert_eq!(classify_frame(3, 2), FrameClass::DefectPresent);
        assert_eq!(classify_frame(1, 1), FrameClass::DefectPresent);
        assert!(!classify_frame(3, 2).operator_dependent());
    }
}
