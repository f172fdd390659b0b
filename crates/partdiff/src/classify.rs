//! Correspondence between candidate defect regions and known master
//! geometry.
//!
//! A surviving blob in the cleaned difference mask is either an echo of
//! geometry the master already has (slight pose mismatch re-exposing a
//! known edge) or a true anomaly. Shape matching against the master
//! contours separates the two.

use image::{GrayImage, Rgb, RgbImage};

use crate::contours::{external_contours, Contour};
use crate::moments::match_shapes;

/// Color used to draw matched contours on the diagnostic overlay.
const MATCH_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Configuration for contour classification.
#[derive(Debug, Clone)]
pub struct ClassifyConfig {
    /// A candidate contour is a "known geometry echo" when its shape
    /// distance to any master contour is strictly below this bound.
    pub shape_match_threshold: f64,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            shape_match_threshold: 0.1,
        }
    }
}

/// Classification outcome for one cleaned difference mask.
#[derive(Debug, Clone)]
pub struct Classification {
    /// External contours of the cleaned mask, in discovery order.
    pub candidate_contours: Vec<Contour>,
    /// How many candidate contours matched some master contour.
    pub matched_count: usize,
    /// Copy of the aligned image with matched contours drawn (diagnostic).
    pub annotated: RgbImage,
}

/// Extract candidate contours from the cleaned mask and correlate each
/// against the master contours. The first master contour within the
/// threshold claims the candidate; the search then moves on.
pub fn classify(
    cleaned_mask: &GrayImage,
    master_contours: &[Contour],
    aligned: &RgbImage,
    config: &ClassifyConfig,
) -> Classification {
    let candidate_contours = external_contours(cleaned_mask);
    let mut annotated = aligned.clone();
    let mut matched_count = 0usize;

    for candidate in &candidate_contours {
        for master in master_contours {
            if match_shapes(candidate, master) < config.shape_match_threshold {
                draw_contour(&mut annotated, candidate, MATCH_COLOR);
                matched_count += 1;
                break;
            }
        }
    }
    tracing::debug!(
        "classify: {} candidate contours, {} matched",
        candidate_contours.len(),
        matched_count
    );

    Classification {
        candidate_contours,
        matched_count,
        annotated,
    }
}

/// Paint a contour onto an image with a 3-px stroke.
fn draw_contour(img: &mut RgbImage, contour: &Contour, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    for p in &contour.points {
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                let x = p[0] + dx;
                let y = p[1] + dy;
                if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                    img.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }
}
