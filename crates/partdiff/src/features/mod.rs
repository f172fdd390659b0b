//! Scale/rotation-invariant keypoints with descriptors.
//!
//! The registration stage needs correspondences that survive the
//! perspective and pose changes between the fixtured master shot and a
//! fresh capture. The pipeline here is:
//!
//! 1. **Pyramid** – Gaussian pyramid, one octave per level, for scale
//!    invariance.
//! 2. **Detect** – Harris corner response per level, relative threshold,
//!    non-maximum suppression.
//! 3. **Orient** – intensity-centroid orientation per keypoint, for
//!    rotation invariance.
//! 4. **Describe** – 4×4 cell × 8 orientation-bin gradient histogram
//!    sampled in the keypoint's rotated frame (128 floats, L2-normalized).
//! 5. **Match** – brute-force 2-NN with Lowe ratio test.

mod descriptor;
mod detect;
mod matching;
mod pyramid;

pub use matching::{match_descriptors, DescriptorMatch, MatchConfig};

use image::GrayImage;

/// Descriptor length: 4×4 spatial cells × 8 orientation bins.
pub const DESCRIPTOR_LEN: usize = 128;

/// Fixed-length gradient-histogram descriptor.
pub type Descriptor = [f32; DESCRIPTOR_LEN];

/// A detected keypoint in full-resolution pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Pyramid scale (2^level).
    pub scale: f32,
    /// Dominant orientation in radians.
    pub angle: f32,
    /// Harris corner response at the detection level.
    pub response: f32,
}

/// A keypoint paired with its descriptor. Owned by the registration
/// invocation that created it; not shared beyond matching.
#[derive(Debug, Clone)]
pub struct Feature {
    pub keypoint: Keypoint,
    pub descriptor: Descriptor,
}

/// Configuration for keypoint detection and description.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Hard cap on keypoints kept per image (strongest response first).
    pub max_keypoints: usize,
    /// Number of pyramid octaves.
    pub pyramid_levels: usize,
    /// Harris sensitivity parameter.
    pub harris_k: f32,
    /// Response threshold as a fraction of the per-level maximum response.
    pub response_frac: f32,
    /// Non-maximum suppression radius (pixels, at the detection level).
    pub nms_radius: u32,
    /// Half-size of the descriptor sampling window (pixels, at the
    /// detection level).
    pub patch_radius: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            max_keypoints: 10_000,
            pyramid_levels: 4,
            harris_k: 0.04,
            response_frac: 0.01,
            nms_radius: 3,
            patch_radius: 8,
        }
    }
}

/// Detect keypoints and compute their descriptors.
///
/// Keypoints are reported in level-0 pixel coordinates, sorted by response
/// (strongest first) and capped at `config.max_keypoints`.
pub fn detect_and_describe(gray: &GrayImage, config: &FeatureConfig) -> Vec<Feature> {
    let levels = pyramid::build(gray, config.pyramid_levels);
    let mut features = Vec::new();
    for (level, img) in levels.iter().enumerate() {
        let scale = (1u32 << level) as f32;
        let corners = detect::detect_corners(img, config);
        for c in corners {
            let angle = detect::orientation(img, c.x, c.y, config.patch_radius);
            let Some(descriptor) = descriptor::describe(img, c.x, c.y, angle, config.patch_radius)
            else {
                continue;
            };
            features.push(Feature {
                keypoint: Keypoint {
                    x: c.x * scale,
                    y: c.y * scale,
                    scale,
                    angle,
                    response: c.response,
                },
                descriptor,
            });
        }
    }
    features.sort_by(|a, b| {
        b.keypoint
            .response
            .partial_cmp(&a.keypoint.response)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    features.truncate(config.max_keypoints);
    tracing::debug!("{} keypoints detected", features.len());
    features
}
