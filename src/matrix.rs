//! 2×3 affine transforms in PostScript order.
//!
//! `[a, b, c, d, e, f]` maps `(x, y)` to `(a·x + c·y + e, b·x + d·y + f)`.
//! Points are row vectors, so `p · (A ∘ B)` applies `A` first.

use std::ops::Mul;

use glam::{DVec2, dvec2};

use crate::errors::Singular;

/// Relative tolerance used when testing a map for isotropy.
const ISOTROPY_FUZZ: f64 = 0.0000001;

/// An affine map of the plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine(pub [f64; 6]);

impl Default for Affine {
    fn default() -> Self {
        Affine::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Affine([a, b, c, d, e, f])
    }

    pub const fn translate(x: f64, y: f64) -> Self {
        Affine([1.0, 0.0, 0.0, 1.0, x, y])
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Affine([sx, 0.0, 0.0, sy, 0.0, 0.0])
    }

    /// Counterclockwise rotation by `degrees`.
    pub fn rotate(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        Affine([c, s, -s, c, 0.0, 0.0])
    }

    /// Apply `self`, then `then`.
    pub fn compose(&self, then: &Affine) -> Affine {
        let m = &self.0;
        let n = &then.0;
        Affine([
            m[0] * n[0] + m[1] * n[2],
            m[0] * n[1] + m[1] * n[3],
            m[2] * n[0] + m[3] * n[2],
            m[2] * n[1] + m[3] * n[3],
            m[4] * n[0] + m[5] * n[2] + n[4],
            m[4] * n[1] + m[5] * n[3] + n[5],
        ])
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        self.0[0] * self.0[3] - self.0[1] * self.0[2]
    }

    /// Inverse map; fails only when the determinant is exactly zero.
    pub fn invert(&self) -> Result<Affine, Singular> {
        let m = &self.0;
        let det = self.determinant();
        if det == 0.0 {
            return Err(Singular);
        }
        let inv = 1.0 / det;
        Ok(Affine([
            inv * m[3],
            -inv * m[1],
            -inv * m[2],
            inv * m[0],
            inv * (m[2] * m[5] - m[3] * m[4]),
            inv * (m[1] * m[4] - m[0] * m[5]),
        ]))
    }

    /// Map a point, translation included.
    #[inline]
    pub fn apply(&self, p: DVec2) -> DVec2 {
        let m = &self.0;
        dvec2(
            m[0] * p.x + m[2] * p.y + m[4],
            m[1] * p.x + m[3] * p.y + m[5],
        )
    }

    /// Map a displacement (linear part only).
    #[inline]
    pub fn apply_vector(&self, v: DVec2) -> DVec2 {
        let m = &self.0;
        dvec2(m[0] * v.x + m[2] * v.y, m[1] * v.x + m[3] * v.y)
    }

    /// Singular values of the linear part, `(min, max)`.
    ///
    /// These are the square roots of the eigenvalues of `M·Mᵗ`, solved in
    /// closed form. Negative discriminants from roundoff are clamped.
    pub fn singular_values(&self) -> (f64, f64) {
        let m = &self.0;
        let p0 = m[0] * m[0] + m[1] * m[1];
        let p1 = m[0] * m[2] + m[1] * m[3];
        let p3 = m[2] * m[2] + m[3] * m[3];
        let trace = p0 + p3;
        let det = p0 * p3 - p1 * p1;
        let disc = (trace * trace - 4.0 * det).max(0.0).sqrt();
        let s1 = (0.5 * (trace - disc)).max(0.0);
        let s2 = (0.5 * (trace + disc)).max(0.0);
        (s1.sqrt(), s2.sqrt())
    }

    /// The smaller singular value, used to scale line widths, dash
    /// lengths and font sizes.
    pub fn norm(&self) -> f64 {
        self.singular_values().0
    }

    /// Scale the linear part so that its norm is 1. The translation is
    /// kept.
    pub fn normalize(&self) -> Result<Affine, Singular> {
        let norm = self.norm();
        if norm == 0.0 {
            return Err(Singular);
        }
        let m = &self.0;
        Ok(Affine([m[0] / norm, m[1] / norm, m[2] / norm, m[3] / norm, m[4], m[5]]))
    }

    /// True when the map sends the coordinate axes to themselves.
    pub fn axes_preserved(&self) -> bool {
        self.0[1] == 0.0 && self.0[2] == 0.0
    }

    /// True when the map is a similarity (uniform scale, possibly with a
    /// rotation or a reflection), i.e. it maps circles to circles.
    pub fn is_uniform(&self) -> bool {
        let t = &self.0;
        let tol1 = ISOTROPY_FUZZ * (t[0] * t[0]).max(t[1] * t[1]);
        let tol2 = ISOTROPY_FUZZ * (t[2] * t[2]).max(t[3] * t[3]);
        let zero = |v: f64| v.abs() < tol1 && v.abs() < tol2;
        zero(t[0] * t[0] + t[1] * t[1] - t[2] * t[2] - t[3] * t[3])
            && zero(t[0] * t[2] + t[1] * t[3])
    }

    /// True when the map, combined with a flipped-y device frame if
    /// `flipped_y`, preserves orientation.
    pub fn is_nonreflecting(&self, flipped_y: bool) -> bool {
        let sign = if flipped_y { -1.0 } else { 1.0 };
        sign * self.determinant() >= 0.0
    }

    /// Map taking the unit square onto the parallelogram with vertices
    /// `p0`, `p1`, `p2` (counterclockwise), inverted: user → NDC.
    pub fn from_parallelogram(p0: DVec2, p1: DVec2, p2: DVec2) -> Result<Affine, Singular> {
        let v1 = p1 - p0;
        let v2 = p2 - p0;
        let cross = v1.perp_dot(v2);
        if cross == 0.0 {
            return Err(Singular);
        }
        Ok(Affine([
            v2.y / cross,
            -v1.y / cross,
            -v2.x / cross,
            v1.x / cross,
            -(p0.x * v2.y - p0.y * v2.x) / cross,
            (p0.x * v1.y - p0.y * v1.x) / cross,
        ]))
    }

    pub fn approx_eq(&self, other: &Affine, tol: f64) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| (a - b).abs() <= tol)
    }
}

/// `a * b` applies `a` first, matching [`Affine::compose`].
impl Mul for Affine {
    type Output = Affine;

    fn mul(self, rhs: Affine) -> Affine {
        self.compose(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> [Affine; 3] {
        [
            Affine::new(2.0, 0.5, -1.0, 3.0, 4.0, -7.0),
            Affine::rotate(33.0) * Affine::translate(1.5, 2.5),
            Affine::new(0.25, 0.0, 0.0, -4.0, 100.0, 0.0),
        ]
    }

    // ==================== Compose tests ====================

    #[test]
    fn compose_is_associative() {
        let [a, b, c] = sample();
        let left = (a * b) * c;
        let right = a * (b * c);
        assert!(left.approx_eq(&right, 1e-9), "{left:?} vs {right:?}");
    }

    #[test]
    fn compose_applies_left_first() {
        let m = Affine::scale(2.0, 2.0) * Affine::translate(1.0, 0.0);
        assert_eq!(m.apply(dvec2(1.0, 1.0)), dvec2(3.0, 2.0));
    }

    // ==================== Invert tests ====================

    #[test]
    fn invert_round_trips_to_identity() {
        for a in sample() {
            let inv = a.invert().unwrap();
            assert!((a * inv).approx_eq(&Affine::IDENTITY, 1e-9));
            assert!((inv * a).approx_eq(&Affine::IDENTITY, 1e-9));
        }
    }

    #[test]
    fn invert_rejects_singular() {
        assert_eq!(Affine::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0).invert(), Err(Singular));
    }

    // ==================== Singular value tests ====================

    #[test]
    fn singular_values_of_scale() {
        let (lo, hi) = Affine::scale(3.0, -5.0).singular_values();
        assert!((lo - 3.0).abs() < 1e-12);
        assert!((hi - 5.0).abs() < 1e-12);
    }

    #[test]
    fn singular_values_ignore_rotation() {
        let m = Affine::scale(2.0, 7.0) * Affine::rotate(41.0);
        let (lo, hi) = m.singular_values();
        assert!((lo - 2.0).abs() < 1e-9);
        assert!((hi - 7.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_gives_unit_norm() {
        let m = Affine::new(4.0, 0.0, 0.0, 8.0, 3.0, 3.0).normalize().unwrap();
        assert!((m.norm() - 1.0).abs() < 1e-12);
        assert_eq!(m.0[4], 3.0);
        assert!(Affine::new(0.0, 0.0, 0.0, 0.0, 1.0, 1.0).normalize().is_err());
    }

    // ==================== Classification tests ====================

    #[test]
    fn classifies_maps() {
        assert!(Affine::scale(2.0, 3.0).axes_preserved());
        assert!(!Affine::scale(2.0, 3.0).is_uniform());
        assert!(Affine::rotate(30.0).is_uniform());
        assert!(!Affine::rotate(30.0).axes_preserved());
        assert!(Affine::scale(1.0, -1.0).is_uniform());
        assert!(!Affine::scale(1.0, -1.0).is_nonreflecting(false));
        assert!(Affine::scale(1.0, -1.0).is_nonreflecting(true));
    }

    #[test]
    fn parallelogram_maps_onto_unit_square() {
        let m = Affine::from_parallelogram(dvec2(10.0, 20.0), dvec2(30.0, 20.0), dvec2(10.0, 60.0))
            .unwrap();
        assert!((m.apply(dvec2(10.0, 20.0)) - dvec2(0.0, 0.0)).length() < 1e-12);
        assert!((m.apply(dvec2(30.0, 60.0)) - dvec2(1.0, 1.0)).length() < 1e-12);
        assert!(Affine::from_parallelogram(DVec2::ZERO, DVec2::ONE, dvec2(2.0, 2.0)).is_err());
    }
}
