//! Gaussian image pyramid, one octave per level.

use image::{GrayImage, ImageBuffer, Luma};

/// Build a pyramid with `levels` octaves. Level 0 is the input image
/// itself; each subsequent level is Gaussian-smoothed and half-sampled.
/// Levels smaller than 16 px on a side are not produced.
pub(crate) fn build(gray: &GrayImage, levels: usize) -> Vec<GrayImage> {
    let mut out = Vec::with_capacity(levels.max(1));
    out.push(gray.clone());
    for _ in 1..levels {
        let prev = out.last().expect("pyramid has a base level");
        let (w, h) = prev.dimensions();
        if w / 2 < 16 || h / 2 < 16 {
            break;
        }
        out.push(half_sample(&blur(prev, 1.0)));
    }
    out
}

/// Gaussian blur via `imageproc` on an f32 working buffer.
fn blur(img: &GrayImage, sigma: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut f = ImageBuffer::<Luma<f32>, Vec<f32>>::new(w, h);
    for (x, y, p) in img.enumerate_pixels() {
        f.put_pixel(x, y, Luma([p[0] as f32]));
    }
    let blurred = imageproc::filter::gaussian_blur_f32(&f, sigma);
    let mut out = GrayImage::new(w, h);
    for (x, y, p) in blurred.enumerate_pixels() {
        out.put_pixel(x, y, Luma([p[0].round().clamp(0.0, 255.0) as u8]));
    }
    out
}

/// Decimate by two, averaging each 2×2 block.
fn half_sample(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let (ow, oh) = (w / 2, h / 2);
    let mut out = GrayImage::new(ow, oh);
    for y in 0..oh {
        for x in 0..ow {
            let sum: u32 = [(0, 0), (1, 0), (0, 1), (1, 1)]
                .iter()
                .map(|&(dx, dy)| img.get_pixel(2 * x + dx, 2 * y + dy)[0] as u32)
                .sum();
            out.put_pixel(x, y, Luma([(sum / 4) as u8]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pyramid_halves_dimensions() {
        let img = GrayImage::new(128, 96);
        let p = build(&img, 3);
        assert_eq!(p.len(), 3);
        assert_eq!(p[0].dimensions(), (128, 96));
        assert_eq!(p[1].dimensions(), (64, 48));
        assert_eq!(p[2].dimensions(), (32, 24));
    }

    #[test]
    fn pyramid_stops_before_degenerate_levels() {
        let img = GrayImage::new(40, 40);
        let p = build(&img, 5);
        // 40 → 20; 20/2 = 10 < 16 stops the chain.
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn half_sample_averages_blocks() {
        let mut img = GrayImage::new(2, 2);
        img.put_pixel(0, 0, Luma([100]));
        img.put_pixel(1, 0, Luma([200]));
        img.put_pixel(0, 1, Luma([0]));
        img.put_pixel(1, 1, Luma([100]));
        let s = half_sample(&img);
        assert_eq!(s.get_pixel(0, 0)[0], 100);
    }
}
