//! Contour moments, Hu invariants, and the shape-similarity distance.
//!
//! Moments are taken over the closed boundary polygon via Green's
//! theorem, so the metric depends only on the traced outline, not on a
//! rasterized fill. The Hu set is invariant to translation, scale and
//! rotation, which is exactly what lets a "known geometry echo" in the
//! difference mask be recognized at a different pose than the master
//! contour it came from.

use crate::contours::Contour;

const EPS: f64 = 1e-10;

/// Invariants below this magnitude are treated as carrying no signal in
/// the shape distance; symmetric shapes produce exact zeros here that
/// only differ by floating-point noise.
const HU_EPS: f64 = 1e-5;

/// Spatial, central and normalized central moments of a closed polygon.
#[derive(Debug, Clone, Copy, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub mu20: f64,
    pub mu11: f64,
    pub mu02: f64,
    pub mu30: f64,
    pub mu21: f64,
    pub mu12: f64,
    pub mu03: f64,
    pub nu20: f64,
    pub nu11: f64,
    pub nu02: f64,
    pub nu30: f64,
    pub nu21: f64,
    pub nu12: f64,
    pub nu03: f64,
}

/// Green's-theorem moments of the contour polygon up to third order.
///
/// Returns `None` for degenerate contours (fewer than 3 points or
/// vanishing signed area) — such contours carry no usable shape signal.
pub fn polygon_moments(contour: &Contour) -> Option<Moments> {
    let pts = &contour.points;
    if pts.len() < 3 {
        return None;
    }

    let (mut a00, mut a10, mut a01) = (0.0f64, 0.0, 0.0);
    let (mut a20, mut a11, mut a02) = (0.0f64, 0.0, 0.0);
    let (mut a30, mut a21, mut a12, mut a03) = (0.0f64, 0.0, 0.0, 0.0);

    let mut prev = pts[pts.len() - 1];
    for &p in pts {
        let (xi_1, yi_1) = (prev[0] as f64, prev[1] as f64);
        let (xi, yi) = (p[0] as f64, p[1] as f64);
        let cross = xi_1 * yi - xi * yi_1;

        a00 += cross;
        a10 += cross * (xi_1 + xi);
        a01 += cross * (yi_1 + yi);
        a20 += cross * (xi_1 * xi_1 + xi_1 * xi + xi * xi);
        a11 += cross * (xi_1 * (2.0 * yi_1 + yi) + xi * (yi_1 + 2.0 * yi));
        a02 += cross * (yi_1 * yi_1 + yi_1 * yi + yi * yi);
        a30 += cross * (xi_1 * xi_1 * xi_1 + xi_1 * xi_1 * xi + xi_1 * xi * xi + xi * xi * xi);
        a21 += cross
            * (xi_1 * xi_1 * (3.0 * yi_1 + yi)
                + 2.0 * xi_1 * xi * (yi_1 + yi)
                + xi * xi * (yi_1 + 3.0 * yi));
        a12 += cross
            * (yi_1 * yi_1 * (3.0 * xi_1 + xi)
                + 2.0 * yi_1 * yi * (xi_1 + xi)
                + yi * yi * (xi_1 + 3.0 * xi));
        a03 += cross * (yi_1 * yi_1 * yi_1 + yi_1 * yi_1 * yi + yi_1 * yi * yi + yi * yi * yi);
        prev = p;
    }

    if a00.abs() < EPS {
        return None;
    }
    // Orientation-independent: flip the sign so area is positive.
    let s = if a00 > 0.0 { 1.0 } else { -1.0 };

    let m00 = s * a00 / 2.0;
    let m10 = s * a10 / 6.0;
    let m01 = s * a01 / 6.0;
    let m20 = s * a20 / 12.0;
    let m11 = s * a11 / 24.0;
    let m02 = s * a02 / 12.0;
    let m30 = s * a30 / 20.0;
    let m21 = s * a21 / 60.0;
    let m12 = s * a12 / 60.0;
    let m03 = s * a03 / 20.0;

    let cx = m10 / m00;
    let cy = m01 / m00;

    let mu20 = m20 - m10 * cx;
    let mu11 = m11 - m10 * cy;
    let mu02 = m02 - m01 * cy;
    let mu30 = m30 - cx * (3.0 * mu20 + cx * m10);
    let mu21 = m21 - cx * (2.0 * mu11 + cx * m01) - cy * mu20;
    let mu12 = m12 - cy * (2.0 * mu11 + cy * m10) - cx * mu02;
    let mu03 = m03 - cy * (3.0 * mu02 + cy * m01);

    let inv2 = 1.0 / (m00 * m00);
    let inv3 = 1.0 / (m00 * m00 * m00.abs().sqrt());

    Some(Moments {
        m00,
        m10,
        m01,
        mu20,
        mu11,
        mu02,
        mu30,
        mu21,
        mu12,
        mu03,
        nu20: mu20 * inv2,
        nu11: mu11 * inv2,
        nu02: mu02 * inv2,
        nu30: mu30 * inv3,
        nu21: mu21 * inv3,
        nu12: mu12 * inv3,
        nu03: mu03 * inv3,
    })
}

/// The seven Hu moment invariants.
pub fn hu_invariants(m: &Moments) -> [f64; 7] {
    let (n20, n11, n02) = (m.nu20, m.nu11, m.nu02);
    let (n30, n21, n12, n03) = (m.nu30, m.nu21, m.nu12, m.nu03);

    let p = n30 + n12;
    let q = n21 + n03;
    let r = n30 - 3.0 * n12;
    let t = 3.0 * n21 - n03;

    [
        n20 + n02,
        (n20 - n02).powi(2) + 4.0 * n11 * n11,
        r * r + t * t,
        p * p + q * q,
        r * p * (p * p - 3.0 * q * q) + t * q * (3.0 * p * p - q * q),
        (n20 - n02) * (p * p - q * q) + 4.0 * n11 * p * q,
        t * p * (p * p - 3.0 * q * q) - r * q * (3.0 * p * p - q * q),
    ]
}

/// Shape-similarity distance between two contours: Σᵢ |1/mᵢᴬ − 1/mᵢᴮ|
/// over the log-scaled Hu invariants mᵢ = sign(hᵢ)·log₁₀|hᵢ|.
///
/// Smaller is more similar. Returns `f64::INFINITY` when either contour
/// is degenerate or the invariant sets carry no comparable signal, so a
/// strict `< threshold` comparison can never match a degenerate pair.
pub fn match_shapes(a: &Contour, b: &Contour) -> f64 {
    let (Some(ma), Some(mb)) = (polygon_moments(a), polygon_moments(b)) else {
        return f64::INFINITY;
    };
    let hu_a = hu_invariants(&ma);
    let hu_b = hu_invariants(&mb);

    let mut dist = 0.0f64;
    let mut compared = 0usize;
    let mut any_a = false;
    let mut any_b = false;
    for i in 0..7 {
        let (ha, hb) = (hu_a[i], hu_b[i]);
        any_a |= ha.abs() > HU_EPS;
        any_b |= hb.abs() > HU_EPS;
        // Terms where either side is numerically silent are skipped; the
        // invariants of symmetric shapes are exact zeros there.
        if ha.abs() > HU_EPS && hb.abs() > HU_EPS {
            let la = ha.signum() * ha.abs().log10();
            let lb = hb.signum() * hb.abs().log10();
            dist += (1.0 / lb - 1.0 / la).abs();
            compared += 1;
        }
    }
    // One contour entirely without signal cannot be compared to one with.
    if any_a != any_b || compared == 0 {
        return f64::INFINITY;
    }
    dist
}
