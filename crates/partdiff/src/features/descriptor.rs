//! Gradient-orientation-histogram descriptor.
//!
//! A (2r)×(2r) sample grid is laid over the keypoint, rotated into the
//! keypoint's dominant orientation. Gradients are measured by central
//! differences of bilinear samples, rotated back into the keypoint frame,
//! and accumulated into a 4×4 grid of 8-bin orientation histograms with a
//! Gaussian spatial weight. The flattened histogram is L2-normalized,
//! clamped at 0.2 and renormalized so a few saturated bins cannot
//! dominate the distance.

use image::GrayImage;

use super::{Descriptor, DESCRIPTOR_LEN};

const GRID: usize = 4;
const BINS: usize = 8;

/// Compute the descriptor for a keypoint at (x, y) with orientation
/// `angle`. Returns `None` when the rotated window would leave the image.
pub(crate) fn describe(
    img: &GrayImage,
    x: f32,
    y: f32,
    angle: f32,
    patch_radius: u32,
) -> Option<Descriptor> {
    let (w, h) = img.dimensions();
    let r = patch_radius as f32;
    // Rotated window corner can reach r·√2 from the center; one extra
    // pixel for the central-difference stencil.
    let reach = r * std::f32::consts::SQRT_2 + 2.0;
    if x - reach < 0.0 || y - reach < 0.0 || x + reach >= w as f32 || y + reach >= h as f32 {
        return None;
    }

    let (sin, cos) = angle.sin_cos();
    let side = (patch_radius * 2) as usize;
    let sigma = r;
    let mut hist = [0.0f32; DESCRIPTOR_LEN];

    for j in 0..side {
        for i in 0..side {
            // Offsets in the keypoint frame, centered on the keypoint.
            let u = i as f32 - (side as f32 - 1.0) / 2.0;
            let v = j as f32 - (side as f32 - 1.0) / 2.0;
            // Sample position in image coordinates.
            let sx = x + cos * u - sin * v;
            let sy = y + sin * u + cos * v;

            let dx = sample(img, sx + 1.0, sy) - sample(img, sx - 1.0, sy);
            let dy = sample(img, sx, sy + 1.0) - sample(img, sx, sy - 1.0);
            // Gradient expressed in the keypoint frame.
            let gu = cos * dx + sin * dy;
            let gv = -sin * dx + cos * dy;
            let mag = (gu * gu + gv * gv).sqrt();
            if mag == 0.0 {
                continue;
            }
            let weight = (-(u * u + v * v) / (2.0 * sigma * sigma)).exp();

            let ori = gv.atan2(gu).rem_euclid(std::f32::consts::TAU);
            let bin = ((ori / std::f32::consts::TAU) * BINS as f32) as usize % BINS;
            let cell_x = (i * GRID) / side;
            let cell_y = (j * GRID) / side;
            hist[(cell_y * GRID + cell_x) * BINS + bin] += weight * mag;
        }
    }

    normalize(&mut hist);
    for v in hist.iter_mut() {
        *v = v.min(0.2);
    }
    normalize(&mut hist);
    Some(hist)
}

fn normalize(hist: &mut [f32; DESCRIPTOR_LEN]) {
    let norm: f32 = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for v in hist.iter_mut() {
            *v /= norm;
        }
    }
}

/// Bilinear intensity sample; caller guarantees in-bounds coordinates.
fn sample(img: &GrayImage, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let p = |xx: u32, yy: u32| img.get_pixel(xx, yy)[0] as f32;
    p(x0, y0) * (1.0 - fx) * (1.0 - fy)
        + p(x0 + 1, y0) * fx * (1.0 - fy)
        + p(x0, y0 + 1) * (1.0 - fx) * fy
        + p(x0 + 1, y0 + 1) * fx * fy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_util::textured_image;

    #[test]
    fn border_keypoints_are_rejected() {
        let img = textured_image(160, 130);
        assert!(describe(&img, 2.0, 2.0, 0.0, 8).is_none());
        assert!(describe(&img, 80.0, 65.0, 0.0, 8).is_some());
    }

    #[test]
    fn identical_patches_give_identical_descriptors() {
        let img = textured_image(160, 130);
        let a = describe(&img, 48.0, 36.0, 0.3, 8).unwrap();
        let b = describe(&img, 48.0, 36.0, 0.3, 8).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn descriptor_distance_reflects_patch_similarity() {
        let img = textured_image(160, 130);
        let a = describe(&img, 48.0, 36.0, 0.0, 8).unwrap();
        let b = describe(&img, 100.0, 80.0, 0.0, 8).unwrap();
        let d: f32 = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt();
        assert!(d > 1e-3, "distinct patches should not collide, d = {d}");
    }
}
