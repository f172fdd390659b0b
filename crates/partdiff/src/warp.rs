//! Perspective warp into the master pixel frame.
//!
//! Inverse mapping: each output pixel is traced back through H⁻¹ into the
//! candidate image and sampled bilinearly. Pixels that land outside the
//! candidate frame come out black, matching how the difference stage
//! treats uncovered regions (dark = candidate-foreground polarity).

use image::{Rgb, RgbImage};
use nalgebra::Matrix3;

use crate::homography::project;

/// Warp `src` through `h` (src→output frame) into an `out_w`×`out_h`
/// canvas. Returns `None` when `h` is not invertible.
pub fn warp_perspective(
    src: &RgbImage,
    h: &Matrix3<f64>,
    out_w: u32,
    out_h: u32,
) -> Option<RgbImage> {
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 {
        return None;
    }
    let h_inv = h.try_inverse()?;
    let mut out = RgbImage::new(out_w, out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            let [sx, sy] = project(&h_inv, [x as f64, y as f64]);
            if !sx.is_finite() || !sy.is_finite() {
                continue;
            }
            // Half a pixel of slack absorbs homography round-off at the
            // frame edge; anything further out is genuinely uncovered.
            if sx < -0.5 || sy < -0.5 || sx > (sw - 1) as f64 + 0.5 || sy > (sh - 1) as f64 + 0.5 {
                continue;
            }
            let sx = sx.clamp(0.0, (sw - 1) as f64);
            let sy = sy.clamp(0.0, (sh - 1) as f64);
            out.put_pixel(x, y, sample_rgb(src, sx, sy));
        }
    }
    Some(out)
}

fn sample_rgb(img: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (w, h) = img.dimensions();
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let p00 = img.get_pixel(x0, y0)[c] as f64;
        let p10 = img.get_pixel(x1, y0)[c] as f64;
        let p01 = img.get_pixel(x0, y1)[c] as f64;
        let p11 = img.get_pixel(x1, y1)[c] as f64;
        let v = p00 * (1.0 - fx) * (1.0 - fy)
            + p10 * fx * (1.0 - fy)
            + p01 * (1.0 - fx) * fy
            + p11 * fx * fy;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}
