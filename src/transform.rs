//! Perspective transformation between two quadrilaterals
//!
//! This module estimates the projective (homography) mapping that takes one
//! four-point quad onto another and evaluates it on single points:
//!
//! ```text
//! x' = (h11 x + h12 y + h13) / (h31 x + h32 y + 1)
//! y' = (h21 x + h22 y + h23) / (h31 x + h32 y + 1)
//! ```
//!
//! The eight free coefficients are found by least squares through the normal
//! equations `(AᵗA)⁻¹ Aᵗ b`. Bad geometry never aborts a warp: estimation falls
//! back to the identity mapping and reports it through [`EstimateStatus`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WarpError};
use crate::matrix::{Matrix, DEFAULT_PIVOT_EPSILON};
use crate::quad::{Point, PointQuad};

/// Coefficients are snapped to this grid to drop floating noise
const COEFF_ROUNDING: f64 = 1e10;

/// Relative triangle area below which three corners count as collinear
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Pass-through coefficients used when estimation fails
pub const IDENTITY_COEFFS: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Outcome of a homography estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EstimateStatus {
    /// Coefficients come from the correspondences
    #[default]
    Solved,
    /// Correspondences were degenerate; coefficients are the identity
    Fallback,
}

/// Projective transform coefficients `h11..h32, h33` with `h33 = 1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    coeffs: [f64; 9],
    status: EstimateStatus,
}

impl Homography {
    /// The identity mapping, reported as solved
    pub fn identity() -> Self {
        Self {
            coeffs: IDENTITY_COEFFS,
            status: EstimateStatus::Solved,
        }
    }

    fn fallback() -> Self {
        Self {
            coeffs: IDENTITY_COEFFS,
            status: EstimateStatus::Fallback,
        }
    }

    /// Estimate the mapping `src -> dst`, falling back to the identity on
    /// degenerate input.
    pub fn estimate(src: &PointQuad, dst: &PointQuad, epsilon: f64) -> Self {
        match Self::try_estimate(src, dst, epsilon) {
            Ok(h) => h,
            Err(e) => {
                debug!("Homography estimate failed ({}), using identity", e);
                Self::fallback()
            }
        }
    }

    /// Estimate the mapping `src -> dst`, reporting degenerate input as
    /// [`WarpError::DegenerateCorrespondence`].
    pub fn try_estimate(src: &PointQuad, dst: &PointQuad, epsilon: f64) -> Result<Self> {
        if is_degenerate(src) || is_degenerate(dst) {
            return Err(WarpError::DegenerateCorrespondence);
        }

        let s = src.flatten();
        let b = dst.flatten();

        // Two rows per correspondence (x, y) -> (x', y'):
        //   h11 x + h12 y + h13 - h31 x x' - h32 y x' = x'
        //   h21 x + h22 y + h23 - h31 x y' - h32 y y' = y'
        let mut rows = Vec::with_capacity(8);
        for i in 0..4 {
            let (x, y) = (s[2 * i], s[2 * i + 1]);
            let (xp, yp) = (b[2 * i], b[2 * i + 1]);
            rows.push([x, y, 1.0, 0.0, 0.0, 0.0, -xp * x, -xp * y]);
            rows.push([0.0, 0.0, 0.0, x, y, 1.0, -yp * x, -yp * y]);
        }

        let a = Matrix::from_rows(&rows)?;
        let at = a.transpose();
        let normal = at.multiply(&a)?.invert(epsilon).map_err(|e| match e {
            WarpError::SingularMatrix { .. } => WarpError::DegenerateCorrespondence,
            other => other,
        })?;
        let solution = normal.multiply(&at)?.mul_vec(&b)?;

        let mut coeffs = [1.0; 9];
        for (c, v) in coeffs.iter_mut().zip(&solution) {
            *c = (v * COEFF_ROUNDING).round() / COEFF_ROUNDING;
        }

        Ok(Self {
            coeffs,
            status: EstimateStatus::Solved,
        })
    }

    pub fn coefficients(&self) -> &[f64; 9] {
        &self.coeffs
    }

    pub fn status(&self) -> EstimateStatus {
        self.status
    }

    pub fn is_fallback(&self) -> bool {
        self.status == EstimateStatus::Fallback
    }

    /// Map a single point
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let h = &self.coeffs;
        let w = h[6] * x + h[7] * y + 1.0;
        let xp = (h[0] * x + h[1] * y + h[2]) / w;
        let yp = (h[3] * x + h[4] * y + h[5]) / w;
        (xp, yp)
    }

    #[inline]
    pub fn apply_point(&self, p: Point) -> Point {
        self.apply(p.x, p.y).into()
    }
}

/// True when any three corners are (nearly) collinear or coincide
fn is_degenerate(quad: &PointQuad) -> bool {
    let pts = quad.points();

    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in pts {
        if !p.x.is_finite() || !p.y.is_finite() {
            return true;
        }
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    let extent = (max_x - min_x).max(max_y - min_y);
    if extent <= 0.0 {
        return true;
    }
    let tolerance = COLLINEAR_TOLERANCE * extent * extent;

    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES.iter().any(|&(i, j, k)| {
        let (a, b, c) = (pts[i], pts[j], pts[k]);
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        cross.abs() <= tolerance
    })
}

/// Estimate `src -> dst` with the default pivot tolerance
pub fn estimate(src: &PointQuad, dst: &PointQuad) -> Homography {
    Homography::estimate(src, dst, DEFAULT_PIVOT_EPSILON)
}

/// Map a point from `src` space into `dst` space
pub fn map_forward(src: &PointQuad, dst: &PointQuad, x: f64, y: f64) -> (f64, f64) {
    estimate(src, dst).apply(x, y)
}

/// Map a point from `dst` space back into `src` space.
///
/// The inverse is estimated from the swapped correspondences rather than by
/// inverting the forward 3x3 matrix.
pub fn map_inverse(src: &PointQuad, dst: &PointQuad, x: f64, y: f64) -> (f64, f64) {
    estimate(dst, src).apply(x, y)
}

/// Forward and inverse homographies estimated once for repeated evaluation
#[derive(Debug, Clone)]
pub struct PerspectiveTransform {
    forward: Homography,
    inverse: Homography,
}

impl PerspectiveTransform {
    /// Compute the transform from 4 source points to 4 destination points
    pub fn compute(src: &PointQuad, dst: &PointQuad, epsilon: f64) -> Self {
        Self {
            forward: Homography::estimate(src, dst, epsilon),
            inverse: Homography::estimate(dst, src, epsilon),
        }
    }

    /// Transform a point from source to destination coordinates
    #[inline]
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        self.forward.apply(x, y)
    }

    /// Transform a point from destination to source coordinates (inverse)
    #[inline]
    pub fn inverse_transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        self.inverse.apply(x, y)
    }

    pub fn forward(&self) -> &Homography {
        &self.forward
    }

    pub fn inverse(&self) -> &Homography {
        &self.inverse
    }

    /// True if either direction fell back to the identity
    pub fn is_fallback(&self) -> bool {
        self.forward.is_fallback() || self.inverse.is_fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn small_quad() -> PointQuad {
        PointQuad::from_flat(&[4.0, 0.2, 3.6, 3.1, 0.1, 0.0, 0.5, 2.7]).unwrap()
    }

    #[test]
    fn test_identity_transform() {
        let src = PointQuad::CANONICAL;
        let h = estimate(&src, &src);
        assert_eq!(h.coefficients(), &IDENTITY_COEFFS);
        assert_eq!(h.status(), EstimateStatus::Solved);

        for (x, y) in [(0.0, 0.0), (1.0, 1.0), (-1.0, -1.0), (0.5, -0.5)] {
            let (xp, yp) = map_forward(&src, &src, x, y);
            assert_abs_diff_eq!(xp, x, epsilon = 1e-9);
            assert_abs_diff_eq!(yp, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_uniform_scale() {
        let src = PointQuad::CANONICAL;
        let dst = src.scaled(2.0);
        assert_eq!(map_forward(&src, &dst, 0.0, 0.0), (0.0, 0.0));
        assert_eq!(map_forward(&src, &dst, 1.0, 1.0), (2.0, 2.0));
    }

    #[test]
    fn test_corners_map_onto_destination() {
        let src = PointQuad::CANONICAL;
        let dst = PointQuad::from_flat(&[9570.0, 3643.0, 8105.0, 6155.0, 4547.0, 3643.0, 6012.0, 6155.0])
            .unwrap();
        let h = estimate(&src, &dst);
        assert!(!h.is_fallback());
        for (s, d) in src.points().iter().zip(dst.points()) {
            let p = h.apply_point(*s);
            assert_abs_diff_eq!(p.x, d.x, epsilon = 1e-4);
            assert_abs_diff_eq!(p.y, d.y, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_round_trip() {
        let src = PointQuad::CANONICAL;
        let dst = small_quad();
        for (x, y) in [(0.2, 0.3), (-0.5, 0.7), (0.9, -0.1), (0.0, 0.0)] {
            let (fx, fy) = map_forward(&src, &dst, x, y);
            let (bx, by) = map_inverse(&src, &dst, fx, fy);
            assert_abs_diff_eq!(bx, x, epsilon = 1e-6);
            assert_abs_diff_eq!(by, y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_round_trip_pixel_scale() {
        // Coefficient rounding at 1e-10 dominates once coordinates reach ~1e4
        let src = PointQuad::CANONICAL;
        let dst = PointQuad::from_flat(&[9570.0, 3643.0, 8105.0, 6155.0, 4547.0, 3643.0, 6012.0, 6155.0])
            .unwrap();
        let t = PerspectiveTransform::compute(&src, &dst, DEFAULT_PIVOT_EPSILON);
        let mut worst: f64 = 0.0;
        for i in 0..=10 {
            for j in 0..=10 {
                let (x, y) = (-1.0 + 0.2 * i as f64, -1.0 + 0.2 * j as f64);
                let (fx, fy) = t.transform_point(x, y);
                let (bx, by) = t.inverse_transform_point(fx, fy);
                worst = worst.max((bx - x).abs()).max((by - y).abs());
            }
        }
        assert!(worst < 1e-5, "worst round-trip error {}", worst);
    }

    #[test]
    fn test_perspective_transform_matches_free_functions() {
        let src = PointQuad::CANONICAL;
        let dst = small_quad();
        let t = PerspectiveTransform::compute(&src, &dst, DEFAULT_PIVOT_EPSILON);
        assert!(!t.is_fallback());
        assert_eq!(t.transform_point(0.25, -0.4), map_forward(&src, &dst, 0.25, -0.4));
        assert_eq!(
            t.inverse_transform_point(2.0, 1.5),
            map_inverse(&src, &dst, 2.0, 1.5)
        );
    }

    #[test]
    fn test_collinear_destination_falls_back() {
        let src = PointQuad::CANONICAL;
        // Top-right, bottom-right and top-left on the line y = x
        let dst = PointQuad::from_flat(&[0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 5.0, 1.0]).unwrap();
        let h = estimate(&src, &dst);
        assert_eq!(h.coefficients(), &IDENTITY_COEFFS);
        assert!(h.is_fallback());
        assert_eq!(
            Homography::try_estimate(&src, &dst, DEFAULT_PIVOT_EPSILON),
            Err(WarpError::DegenerateCorrespondence)
        );
    }

    #[test]
    fn test_coincident_destination_falls_back() {
        let src = PointQuad::CANONICAL;
        let dst = PointQuad::from_flat(&[1.0; 8]).unwrap();
        assert!(estimate(&src, &dst).is_fallback());
        assert_eq!(map_forward(&src, &dst, 0.3, 0.4), (0.3, 0.4));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&EstimateStatus::Fallback).unwrap();
        assert_eq!(json, "\"fallback\"");
    }
}
