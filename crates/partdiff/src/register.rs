//! Feature-based registration of a candidate capture onto the master
//! frame, plus derivation of the raw structural difference mask.

use image::{GrayImage, RgbImage};
use nalgebra::Matrix3;

use crate::contours::{external_contours, Contour};
use crate::features::{detect_and_describe, match_descriptors, FeatureConfig, MatchConfig};
use crate::homography::{fit_ransac, HomographyError, RansacConfig};
use crate::preprocess::luma;
use crate::threshold::{absolute_diff, binarize, binarize_inv, or_masks, otsu_level};
use crate::warp::warp_perspective;

/// Registration failure. No partial results are ever returned: any stage
/// failing aborts the whole alignment.
#[derive(Debug)]
pub enum AlignmentError {
    /// Fewer ratio-test survivors than the minimum a homography needs.
    InsufficientMatches { needed: usize, got: usize },
    /// Robust estimation could not produce a usable homography.
    Homography(HomographyError),
    /// The estimated homography is not invertible, so the candidate
    /// cannot be resampled into the master frame.
    SingularHomography,
    /// An input image has no pixels.
    EmptyImage,
}

impl std::fmt::Display for AlignmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientMatches { needed, got } => {
                write!(f, "not enough good matches: need {needed}, got {got}")
            }
            Self::Homography(e) => write!(f, "homography estimation failed: {e}"),
            Self::SingularHomography => write!(f, "estimated homography is singular"),
            Self::EmptyImage => write!(f, "input image is empty"),
        }
    }
}

impl std::error::Error for AlignmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Homography(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HomographyError> for AlignmentError {
    fn from(e: HomographyError) -> Self {
        Self::Homography(e)
    }
}

/// Registration configuration: detection, matching and robust-fit
/// parameters in one place.
#[derive(Debug, Clone, Default)]
pub struct RegisterConfig {
    pub features: FeatureConfig,
    pub matching: MatchConfig,
    pub ransac: RansacConfig,
}

/// Everything the difference pipeline needs from one alignment.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Raw combined difference mask (master foreground OR'd with the
    /// inverse-thresholded warped candidate, re-binarized).
    pub mask: GrayImage,
    /// Candidate resampled into the master pixel frame.
    pub aligned: RgbImage,
    /// External contours of the master foreground.
    pub master_contours: Vec<Contour>,
    /// Otsu-binarized master intensity.
    pub master_foreground: GrayImage,
    /// Absolute intensity difference master vs warped candidate
    /// (diagnostic only).
    pub absolute_diff: GrayImage,
    /// Fitted candidate→master homography.
    pub homography: Matrix3<f64>,
    /// Ratio-test survivor count that supported the fit.
    pub match_count: usize,
}

/// Align `candidate` onto `master` and derive the raw difference mask.
pub fn align(
    master: &RgbImage,
    candidate: &RgbImage,
    config: &RegisterConfig,
) -> Result<Registration, AlignmentError> {
    if master.width() == 0 || master.height() == 0 || candidate.width() == 0
        || candidate.height() == 0
    {
        return Err(AlignmentError::EmptyImage);
    }

    let master_gray = luma(master);
    let candidate_gray = luma(candidate);

    let master_features = detect_and_describe(&master_gray, &config.features);
    let candidate_features = detect_and_describe(&candidate_gray, &config.features);
    tracing::debug!(
        "registration: {} master / {} candidate keypoints",
        master_features.len(),
        candidate_features.len()
    );

    let matches = match_descriptors(&master_features, &candidate_features, &config.matching);
    if matches.len() < 4 {
        return Err(AlignmentError::InsufficientMatches {
            needed: 4,
            got: matches.len(),
        });
    }

    // Candidate points map onto master points.
    let src: Vec<[f64; 2]> = matches
        .iter()
        .map(|m| {
            let k = &candidate_features[m.train].keypoint;
            [k.x as f64, k.y as f64]
        })
        .collect();
    let dst: Vec<[f64; 2]> = matches
        .iter()
        .map(|m| {
            let k = &master_features[m.query].keypoint;
            [k.x as f64, k.y as f64]
        })
        .collect();

    let fit = fit_ransac(&src, &dst, &config.ransac)?;
    tracing::debug!(
        "registration: {}/{} RANSAC inliers",
        fit.inlier_count,
        matches.len()
    );

    let aligned = warp_perspective(candidate, &fit.h, master.width(), master.height())
        .ok_or(AlignmentError::SingularHomography)?;
    let aligned_gray = luma(&aligned);

    let master_foreground = binarize(&master_gray, otsu_level(&master_gray));
    let master_contours = external_contours(&master_foreground);
    tracing::debug!("registration: {} master contours", master_contours.len());

    let aligned_inv = binarize_inv(&aligned_gray, otsu_level(&aligned_gray));
    let combined = or_masks(&master_foreground, &aligned_inv);
    let mask = binarize(&combined, otsu_level(&combined));

    let absolute = absolute_diff(&master_gray, &aligned_gray);

    Ok(Registration {
        mask,
        aligned,
        master_contours,
        master_foreground,
        absolute_diff: absolute,
        homography: fit.h,
        match_count: matches.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    /// Bright asymmetric texture on a dark ground, in color.
    fn textured_part(w: u32, h: u32) -> RgbImage {
        let gray = crate::features::test_util::textured_image(w, h);
        let mut img = RgbImage::new(w, h);
        for (x, y, p) in gray.enumerate_pixels() {
            img.put_pixel(x, y, Rgb([p[0], p[0], p[0]]));
        }
        img
    }

    #[test]
    fn identity_pair_aligns_with_identity_homography() {
        let master = textured_part(160, 130);
        let candidate = master.clone();
        let reg = align(&master, &candidate, &RegisterConfig::default()).unwrap();

        for r in 0..3 {
            for c in 0..3 {
                let expect = if r == c { 1.0 } else { 0.0 };
                assert!(
                    (reg.homography[(r, c)] - expect).abs() < 1e-3,
                    "H[{r}][{c}] = {}",
                    reg.homography[(r, c)]
                );
            }
        }
        assert!(reg.match_count >= 4);
        assert_eq!(reg.aligned.as_raw(), candidate.as_raw());
    }

    #[test]
    fn featureless_candidate_fails_alignment() {
        let master = textured_part(160, 130);
        let candidate = RgbImage::new(160, 130);
        let err = align(&master, &candidate, &RegisterConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            AlignmentError::InsufficientMatches { needed: 4, .. }
        ));
    }

    #[test]
    fn empty_image_is_rejected() {
        let master = textured_part(160, 130);
        let candidate = RgbImage::new(0, 0);
        assert!(matches!(
            align(&master, &candidate, &RegisterConfig::default()),
            Err(AlignmentError::EmptyImage)
        ));
    }

    #[test]
    fn master_foreground_splits_intensity_classes() {
        let master = textured_part(160, 130);
        let reg = align(&master, &master.clone(), &RegisterConfig::default()).unwrap();
        // The Otsu split leaves both classes populated on a textured part.
        let fg = reg.master_foreground.pixels().filter(|p| p[0] != 0).count();
        let total = (160 * 130) as usize;
        assert!(fg > 0 && fg < total, "degenerate split: {fg}/{total}");
        assert!(!reg.master_contours.is_empty());
        // Identity alignment: absolute difference is zero everywhere.
        assert!(reg.absolute_diff.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn mask_has_pixel_count_of_master() {
        let master = textured_part(160, 130);
        let reg = align(&master, &master.clone(), &RegisterConfig::default()).unwrap();
        assert_eq!(reg.mask.dimensions(), (160, 130));
        assert_eq!(Luma([255u8]), *reg.mask.get_pixel(0, 0));
    }
}
