//! Automatic global thresholding and binary mask combination.
//!
//! The split level is chosen by maximizing inter-class variance over the
//! 256-bin intensity histogram (Otsu's criterion). Binarization comes in
//! both polarities because the difference pipeline thresholds the master
//! and the warped candidate with opposite senses before combining them.

use image::{GrayImage, Luma};

/// Compute the global threshold level that maximizes inter-class variance.
///
/// Returns the last level scanned when the image is constant; binarizing a
/// constant image with its own level therefore yields an all-background or
/// all-foreground mask, never a mixed one.
pub fn otsu_level(img: &GrayImage) -> u8 {
    let mut hist = [0u32; 256];
    for p in img.pixels() {
        hist[p[0] as usize] += 1;
    }
    let total = img.width() as f64 * img.height() as f64;
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(v, &c)| v as f64 * c as f64)
        .sum();

    let mut best_level = 0u8;
    let mut best_var = -1.0f64;
    let mut w_bg = 0.0f64;
    let mut sum_bg = 0.0f64;
    for t in 0..256usize {
        w_bg += hist[t] as f64;
        if w_bg == 0.0 {
            continue;
        }
        let w_fg = total - w_bg;
        if w_fg == 0.0 {
            break;
        }
        sum_bg += t as f64 * hist[t] as f64;
        let mean_bg = sum_bg / w_bg;
        let mean_fg = (sum_all - sum_bg) / w_fg;
        let between = w_bg * w_fg * (mean_bg - mean_fg) * (mean_bg - mean_fg);
        if between > best_var {
            best_var = between;
            best_level = t as u8;
        }
    }
    best_level
}

/// Binarize: pixels strictly above `level` become 255, the rest 0.
pub fn binarize(img: &GrayImage, level: u8) -> GrayImage {
    map_mask(img, |v| v > level)
}

/// Inverse binarize: pixels at or below `level` become 255, the rest 0.
pub fn binarize_inv(img: &GrayImage, level: u8) -> GrayImage {
    map_mask(img, |v| v <= level)
}

/// Pixel-wise logical OR of two binary masks of identical dimensions.
pub fn or_masks(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    let mut out = GrayImage::new(a.width(), a.height());
    for (x, y, p) in a.enumerate_pixels() {
        let v = if p[0] > 0 || b.get_pixel(x, y)[0] > 0 {
            255
        } else {
            0
        };
        out.put_pixel(x, y, Luma([v]));
    }
    out
}

/// Absolute per-pixel difference of two intensity images.
pub fn absolute_diff(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    let mut out = GrayImage::new(a.width(), a.height());
    for (x, y, p) in a.enumerate_pixels() {
        let d = (p[0] as i16 - b.get_pixel(x, y)[0] as i16).unsigned_abs() as u8;
        out.put_pixel(x, y, Luma([d]));
    }
    out
}

/// Re-binarize a raw combined difference mask so that raised regions come
/// out as foreground: inverse-threshold at the mask's own Otsu level.
pub fn emphasize_raised(raw_mask: &GrayImage) -> GrayImage {
    binarize_inv(raw_mask, otsu_level(raw_mask))
}

fn map_mask(img: &GrayImage, fg: impl Fn(u8) -> bool) -> GrayImage {
    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, p) in img.enumerate_pixels() {
        out.put_pixel(x, y, Luma([if fg(p[0]) { 255 } else { 0 }]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bimodal(w: u32, h: u32, lo: u8, hi: u8) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for (x, _, p) in img.enumerate_pixels_mut() {
            p.0 = [if x < w / 2 { lo } else { hi }];
        }
        img
    }

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let img = bimodal(64, 32, 40, 200);
        let level = otsu_level(&img);
        assert!(level >= 40 && level < 200, "level {level} outside the modes");
    }

    #[test]
    fn binarize_polarity() {
        let img = bimodal(4, 1, 10, 240);
        let level = otsu_level(&img);
        let fg = binarize(&img, level);
        let bg = binarize_inv(&img, level);
        assert_eq!(fg.get_pixel(3, 0)[0], 255);
        assert_eq!(fg.get_pixel(0, 0)[0], 0);
        assert_eq!(bg.get_pixel(3, 0)[0], 0);
        assert_eq!(bg.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn or_masks_is_union() {
        let mut a = GrayImage::new(2, 1);
        let mut b = GrayImage::new(2, 1);
        a.put_pixel(0, 0, Luma([255]));
        b.put_pixel(1, 0, Luma([255]));
        let u = or_masks(&a, &b);
        assert_eq!(u.get_pixel(0, 0)[0], 255);
        assert_eq!(u.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn absolute_diff_symmetric() {
        let a = bimodal(4, 1, 10, 240);
        let b = bimodal(4, 1, 30, 100);
        let d1 = absolute_diff(&a, &b);
        let d2 = absolute_diff(&b, &a);
        assert_eq!(d1.as_raw(), d2.as_raw());
        assert_eq!(d1.get_pixel(0, 0)[0], 20);
        assert_eq!(d1.get_pixel(3, 0)[0], 140);
    }

    #[test]
    fn emphasize_raised_of_uniform_mask_is_empty() {
        let mut m = GrayImage::new(8, 8);
        for p in m.pixels_mut() {
            p.0 = [255];
        }
        let e = emphasize_raised(&m);
        assert!(e.pixels().all(|p| p[0] == 0));
    }
}
