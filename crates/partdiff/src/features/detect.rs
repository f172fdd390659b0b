//! Harris corner detection and keypoint orientation.

use image::{GrayImage, ImageBuffer, Luma};

use super::FeatureConfig;

/// A corner candidate at one pyramid level (level-local coordinates).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Corner {
    pub x: f32,
    pub y: f32,
    pub response: f32,
}

type F32Image = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Harris corner response: R = det(M) − k·trace(M)², where M is the
/// Gaussian-windowed structure tensor of the Sobel gradients.
fn corner_response(img: &GrayImage, k: f32) -> F32Image {
    let (w, h) = img.dimensions();
    let gx = imageproc::gradients::horizontal_sobel(img);
    let gy = imageproc::gradients::vertical_sobel(img);

    let mut xx = F32Image::new(w, h);
    let mut yy = F32Image::new(w, h);
    let mut xy = F32Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let gxv = gx.get_pixel(x, y)[0] as f32;
            let gyv = gy.get_pixel(x, y)[0] as f32;
            xx.put_pixel(x, y, Luma([gxv * gxv]));
            yy.put_pixel(x, y, Luma([gyv * gyv]));
            xy.put_pixel(x, y, Luma([gxv * gyv]));
        }
    }
    let sxx = imageproc::filter::gaussian_blur_f32(&xx, 1.0);
    let syy = imageproc::filter::gaussian_blur_f32(&yy, 1.0);
    let sxy = imageproc::filter::gaussian_blur_f32(&xy, 1.0);

    let mut response = F32Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let a = sxx.get_pixel(x, y)[0];
            let b = syy.get_pixel(x, y)[0];
            let c = sxy.get_pixel(x, y)[0];
            let det = a * b - c * c;
            let trace = a + b;
            response.put_pixel(x, y, Luma([det - k * trace * trace]));
        }
    }
    response
}

/// Detect corners at one pyramid level: relative response threshold
/// followed by non-maximum suppression within `nms_radius`.
pub(crate) fn detect_corners(img: &GrayImage, config: &FeatureConfig) -> Vec<Corner> {
    let (w, h) = img.dimensions();
    // Keep the whole rotated descriptor window plus its gradient stencil
    // inside the image, matching the reach check in the describe step.
    let margin = ((config.patch_radius as f32 * std::f32::consts::SQRT_2 + 2.0).ceil() as u32 + 1)
        .max(config.nms_radius + 1);
    if w <= 2 * margin || h <= 2 * margin {
        return Vec::new();
    }

    let response = corner_response(img, config.harris_k);
    let max_r = response.pixels().map(|p| p[0]).fold(0.0f32, f32::max);
    if max_r <= 0.0 {
        return Vec::new();
    }
    let threshold = config.response_frac * max_r;
    let nms = config.nms_radius as i32;

    let mut corners = Vec::new();
    for y in margin..(h - margin) {
        for x in margin..(w - margin) {
            let r = response.get_pixel(x, y)[0];
            if r < threshold {
                continue;
            }
            // Strict local maximum; ties resolved toward the lower index.
            let idx = (y * w + x) as i64;
            let mut is_max = true;
            'window: for dy in -nms..=nms {
                for dx in -nms..=nms {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = (x as i32 + dx) as u32;
                    let ny = (y as i32 + dy) as u32;
                    if nx >= w || ny >= h {
                        continue;
                    }
                    let nr = response.get_pixel(nx, ny)[0];
                    let nidx = (ny * w + nx) as i64;
                    if nr > r || (nr == r && nidx < idx) {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if is_max {
                corners.push(Corner {
                    x: x as f32,
                    y: y as f32,
                    response: r,
                });
            }
        }
    }
    corners
}

/// Intensity-centroid orientation of the patch around (x, y):
/// atan2 of the first-order patch moments. Stable under rotation of the
/// underlying image content.
pub(crate) fn orientation(img: &GrayImage, x: f32, y: f32, radius: u32) -> f32 {
    let (w, h) = img.dimensions();
    let r = radius as i32;
    let cx = x.round() as i32;
    let cy = y.round() as i32;
    let mut m10 = 0.0f32;
    let mut m01 = 0.0f32;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy > r * r {
                continue;
            }
            let px = cx + dx;
            let py = cy + dy;
            if px < 0 || py < 0 || px >= w as i32 || py >= h as i32 {
                continue;
            }
            let v = img.get_pixel(px as u32, py as u32)[0] as f32;
            m10 += dx as f32 * v;
            m01 += dy as f32 * v;
        }
    }
    m01.atan2(m10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_util::textured_image;

    #[test]
    fn corners_found_inside_detection_margin() {
        let img = textured_image(160, 130);
        let corners = detect_corners(&img, &FeatureConfig::default());
        assert!(!corners.is_empty());
        // Every corner sits on a response maximum well inside the frame.
        for c in &corners {
            assert!(c.x >= 13.0 && c.y >= 13.0);
            assert!(c.response > 0.0);
        }
    }

    #[test]
    fn uniform_image_yields_nothing() {
        let img = GrayImage::new(100, 100);
        assert!(detect_corners(&img, &FeatureConfig::default()).is_empty());
    }

    #[test]
    fn orientation_points_toward_bright_side() {
        // Bright half-plane to the right of the center: centroid angle ~0.
        let mut img = GrayImage::new(64, 64);
        for y in 0..64 {
            for x in 32..64 {
                img.put_pixel(x, y, Luma([200]));
            }
        }
        let a = orientation(&img, 32.0, 32.0, 8);
        assert!(a.abs() < 0.2, "angle {a}");
    }
}
