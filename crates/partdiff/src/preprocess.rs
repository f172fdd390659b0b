//! Intensity normalization for registration.
//!
//! Every stage downstream of capture works on single-channel intensity;
//! this is the only place color is touched.

use image::{GrayImage, Luma, RgbImage};

/// Convert a color image to single-channel intensity (Rec. 601 luma).
///
/// Output has identical dimensions. Pure; no failure modes.
pub fn luma(src: &RgbImage) -> GrayImage {
    let (w, h) = src.dimensions();
    let mut out = GrayImage::new(w, h);
    for (x, y, p) in src.enumerate_pixels() {
        let [r, g, b] = p.0;
        let v = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        out.put_pixel(x, y, Luma([v.round().clamp(0.0, 255.0) as u8]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn luma_preserves_dimensions() {
        let src = RgbImage::new(17, 9);
        let gray = luma(&src);
        assert_eq!(gray.dimensions(), (17, 9));
    }

    #[test]
    fn luma_of_gray_pixel_is_identity() {
        let mut src = RgbImage::new(1, 1);
        src.put_pixel(0, 0, Rgb([100, 100, 100]));
        assert_eq!(luma(&src).get_pixel(0, 0)[0], 100);
    }

    #[test]
    fn luma_weights_green_heaviest() {
        let mut src = RgbImage::new(3, 1);
        src.put_pixel(0, 0, Rgb([255, 0, 0]));
        src.put_pixel(1, 0, Rgb([0, 255, 0]));
        src.put_pixel(2, 0, Rgb([0, 0, 255]));
        let g = luma(&src);
        assert!(g.get_pixel(1, 0)[0] > g.get_pixel(0, 0)[0]);
        assert!(g.get_pixel(0, 0)[0] > g.get_pixel(2, 0)[0]);
    }
}
