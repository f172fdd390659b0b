//! Candidate→master homography estimation.
//!
//! Hartley-normalized DLT over point correspondences, wrapped in a seeded
//! RANSAC loop so mismatched descriptors cannot drag the warp off the
//! part. The reprojection gate is tight (2 px by default): registration
//! residue larger than that shows up as streaks in the difference mask
//! and is cheaper to reject here than to filter later.

use nalgebra::{DMatrix, Matrix3, Vector3};
use rand::prelude::*;

/// Why homography estimation failed.
#[derive(Debug, Clone, PartialEq)]
pub enum HomographyError {
    TooFewPoints { needed: usize, got: usize },
    TooFewInliers { needed: usize, found: usize },
    Degenerate(String),
}

impl std::fmt::Display for HomographyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few correspondences: need {needed}, got {got}")
            }
            Self::TooFewInliers { needed, found } => {
                write!(f, "too few RANSAC inliers: need {needed}, found {found}")
            }
            Self::Degenerate(msg) => write!(f, "degenerate configuration: {msg}"),
        }
    }
}

impl std::error::Error for HomographyError {}

/// Project a point through a 3×3 homography.
pub fn project(h: &Matrix3<f64>, p: [f64; 2]) -> [f64; 2] {
    let q = h * Vector3::new(p[0], p[1], 1.0);
    if q[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [q[0] / q[2], q[1] / q[2]]
}

/// Euclidean distance between `project(h, src)` and `dst`.
pub fn reprojection_error(h: &Matrix3<f64>, src: [f64; 2], dst: [f64; 2]) -> f64 {
    let p = project(h, src);
    ((p[0] - dst[0]).powi(2) + (p[1] - dst[1]).powi(2)).sqrt()
}

/// Similarity transform taking the point set to zero centroid and √2 mean
/// radius, plus the transformed points.
fn hartley_normalize(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let (cx, cy) = pts
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
    let (cx, cy) = (cx / n, cy / n);
    let mean_r = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_r > 1e-15 {
        std::f64::consts::SQRT_2 / mean_r
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let mapped = pts
        .iter()
        .map(|p| [s * (p[0] - cx), s * (p[1] - cy)])
        .collect();
    (t, mapped)
}

/// Direct linear transform from ≥4 correspondences: returns H with
/// `dst ≈ project(H, src)`.
pub fn estimate_dlt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<Matrix3<f64>, HomographyError> {
    let n = src.len();
    if n < 4 || dst.len() < 4 {
        return Err(HomographyError::TooFewPoints {
            needed: 4,
            got: n.min(dst.len()),
        });
    }
    if n != dst.len() {
        return Err(HomographyError::Degenerate(
            "src/dst length mismatch".into(),
        ));
    }

    let (t_src, sn) = hartley_normalize(src);
    let (t_dst, dn) = hartley_normalize(dst);

    let mut a = DMatrix::zeros(2 * n, 9);
    for (i, (s, d)) in sn.iter().zip(dn.iter()).enumerate() {
        let (sx, sy) = (s[0], s[1]);
        let (dx, dy) = (d[0], d[1]);
        let rows = [
            [0.0, 0.0, 0.0, -sx, -sy, -1.0, dy * sx, dy * sy, dy],
            [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy, -dx],
        ];
        for (r, row) in rows.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                a[(2 * i + r, c)] = v;
            }
        }
    }

    // Null vector of A via the smallest eigenpair of AᵀA.
    let eig = nalgebra::SymmetricEigen::new(a.transpose() * &a);
    let min_idx = (0..9)
        .min_by(|&i, &j| {
            eig.eigenvalues[i]
                .abs()
                .partial_cmp(&eig.eigenvalues[j].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .expect("nine eigenvalues");
    let hv = eig.eigenvectors.column(min_idx);
    let h_norm = Matrix3::new(
        hv[0], hv[1], hv[2], hv[3], hv[4], hv[5], hv[6], hv[7], hv[8],
    );

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| HomographyError::Degenerate("dst normalization not invertible".into()))?;
    let h = t_dst_inv * h_norm * t_src;

    let scale = h[(2, 2)];
    if scale.abs() < 1e-15 {
        Ok(h)
    } else {
        Ok(h / scale)
    }
}

/// RANSAC configuration for homography fitting.
#[derive(Debug, Clone)]
pub struct RansacConfig {
    /// Maximum sampling iterations.
    pub max_iters: usize,
    /// Inlier gate: reprojection error in pixels.
    pub reproj_threshold: f64,
    /// Minimum inlier count for an acceptable model.
    pub min_inliers: usize,
    /// RNG seed; a fixed seed keeps a given request reproducible.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            reproj_threshold: 2.0,
            min_inliers: 4,
            seed: 0,
        }
    }
}

/// A fitted homography with its inlier support.
#[derive(Debug, Clone)]
pub struct FittedHomography {
    pub h: Matrix3<f64>,
    pub inliers: Vec<bool>,
    pub inlier_count: usize,
}

/// Fit a homography robustly: minimal 4-point DLT hypotheses, inlier
/// scoring by reprojection error, final refit over the best consensus set.
pub fn fit_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    config: &RansacConfig,
) -> Result<FittedHomography, HomographyError> {
    let n = src.len();
    if n < 4 {
        return Err(HomographyError::TooFewPoints { needed: 4, got: n });
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<(usize, Vec<bool>, Matrix3<f64>)> = None;

    for _ in 0..config.max_iters {
        let picks = rand::seq::index::sample(&mut rng, n, 4);
        let s4: Vec<[f64; 2]> = picks.iter().map(|i| src[i]).collect();
        let d4: Vec<[f64; 2]> = picks.iter().map(|i| dst[i]).collect();
        let Ok(h) = estimate_dlt(&s4, &d4) else {
            continue;
        };

        let mut mask = vec![false; n];
        let mut count = 0usize;
        for i in 0..n {
            if reprojection_error(&h, src[i], dst[i]) < config.reproj_threshold {
                mask[i] = true;
                count += 1;
            }
        }
        let best_count = best.as_ref().map_or(0, |(c, _, _)| *c);
        if count > best_count {
            let done = count == n;
            best = Some((count, mask, h));
            if done {
                break;
            }
        }
    }

    let (count, mask, h_coarse) = best.ok_or(HomographyError::TooFewInliers {
        needed: config.min_inliers,
        found: 0,
    })?;
    if count < config.min_inliers {
        return Err(HomographyError::TooFewInliers {
            needed: config.min_inliers,
            found: count,
        });
    }

    // Refit over the consensus set; fall back to the coarse model if the
    // refit turns out degenerate.
    let in_src: Vec<[f64; 2]> = (0..n).filter(|&i| mask[i]).map(|i| src[i]).collect();
    let in_dst: Vec<[f64; 2]> = (0..n).filter(|&i| mask[i]).map(|i| dst[i]).collect();
    let h = estimate_dlt(&in_src, &in_dst).unwrap_or(h_coarse);

    let mut inliers = vec![false; n];
    let mut inlier_count = 0usize;
    for i in 0..n {
        if reprojection_error(&h, src[i], dst[i]) < config.reproj_threshold {
            inliers[i] = true;
            inlier_count += 1;
        }
    }
    Ok(FittedHomography {
        h,
        inliers,
        inlier_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference_h() -> Matrix3<f64> {
        // Rotation + scale + translation + mild perspective.
        Matrix3::new(
            1.2, -0.1, 35.0, //
            0.08, 1.15, -12.0, //
            1e-4, -5e-5, 1.0,
        )
    }

    fn grid(nx: usize, ny: usize, step: f64) -> Vec<[f64; 2]> {
        let mut pts = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                pts.push([i as f64 * step, j as f64 * step]);
            }
        }
        pts
    }

    #[test]
    fn dlt_recovers_exact_homography() {
        let h_true = reference_h();
        let src = grid(4, 4, 25.0);
        let dst: Vec<[f64; 2]> = src.iter().map(|&p| project(&h_true, p)).collect();
        let h = estimate_dlt(&src, &dst).unwrap();
        for (&s, &d) in src.iter().zip(dst.iter()) {
            assert!(reprojection_error(&h, s, d) < 1e-6);
        }
    }

    #[test]
    fn dlt_identity_from_identical_points() {
        let src = grid(3, 3, 40.0);
        let h = estimate_dlt(&src, &src).unwrap();
        for r in 0..3 {
            for c in 0..3 {
                let expect = if r == c { 1.0 } else { 0.0 };
                assert_relative_eq!(h[(r, c)], expect, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn dlt_rejects_three_points() {
        let pts = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]];
        assert!(matches!(
            estimate_dlt(&pts, &pts),
            Err(HomographyError::TooFewPoints { .. })
        ));
    }

    #[test]
    fn ransac_survives_planted_outliers() {
        let h_true = reference_h();
        let mut src = grid(5, 5, 20.0);
        let mut dst: Vec<[f64; 2]> = src.iter().map(|&p| project(&h_true, p)).collect();
        // Six gross outliers.
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..6 {
            src.push([rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)]);
            dst.push([rng.gen_range(400.0..800.0), rng.gen_range(400.0..800.0)]);
        }
        let fit = fit_ransac(&src, &dst, &RansacConfig::default()).unwrap();
        assert!(fit.inlier_count >= 25, "inliers {}", fit.inlier_count);
        for i in 0..25 {
            assert!(reprojection_error(&fit.h, src[i], dst[i]) < 2.0);
        }
        for i in 25..31 {
            assert!(!fit.inliers[i], "outlier {i} marked inlier");
        }
    }

    #[test]
    fn ransac_fails_below_minimum_support() {
        let pts = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]];
        assert!(matches!(
            fit_ransac(&pts, &pts, &RansacConfig::default()),
            Err(HomographyError::TooFewPoints { .. })
        ));
    }

    #[test]
    fn ransac_is_deterministic_for_a_seed() {
        let h_true = reference_h();
        let src = grid(5, 4, 18.0);
        let dst: Vec<[f64; 2]> = src.iter().map(|&p| project(&h_true, p)).collect();
        let a = fit_ransac(&src, &dst, &RansacConfig::default()).unwrap();
        let b = fit_ransac(&src, &dst, &RansacConfig::default()).unwrap();
        assert_eq!(a.inlier_count, b.inlier_count);
        assert_relative_eq!(a.h[(0, 0)], b.h[(0, 0)]);
    }
}
