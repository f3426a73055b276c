//! 2D rotation math.
//!
//! Rotations use the matrix `[[cos, -sin], [sin, cos]]`. In image coordinates (Y pointing down)
//! a positive angle therefore turns points *clockwise* on screen.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use nalgebra::{Matrix2, Matrix2x3, Point2, Vector2, Vector3};

/// Wraps an angle into the range `[-π, π)`.
pub fn normalize_radians(radians: f64) -> f64 {
    radians - TAU * ((radians + PI) / TAU).floor()
}

/// Computes the rotation that makes the vector from `a` to `b` point straight up.
///
/// Returns `0.0` when `b` lies directly above `a` (in image coordinates), and a positive angle
/// when the vector is turned clockwise from there. The result is in range `[-π, π)`.
pub fn compute_rotation(a: impl Into<Point2<f64>>, b: impl Into<Point2<f64>>) -> f64 {
    let (a, b) = (a.into(), b.into());
    let radians = FRAC_PI_2 - f64::atan2(-(b.y - a.y), b.x - a.x);
    normalize_radians(radians)
}

/// A 2x3 affine transform made of a rotation and a translation.
///
/// Points are transformed as the homogeneous column vector `[x, y, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMatrix {
    m: Matrix2x3<f64>,
}

impl RotationMatrix {
    pub fn identity() -> Self {
        Self::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
    }

    /// Creates a transform that rotates by `radians` around `pivot`.
    ///
    /// This is the composition `translate(pivot) * rotate(radians) * translate(-pivot)`, so
    /// `pivot` itself is a fixed point of the transform.
    pub fn new(radians: f64, pivot: impl Into<Point2<f64>>) -> Self {
        let pivot = pivot.into();
        let (sin, cos) = radians.sin_cos();
        let rot = Matrix2::new(cos, -sin, sin, cos);
        let translation = pivot.coords - rot * pivot.coords;
        Self::from_parts(rot, translation)
    }

    /// Creates a transform from its two row vectors.
    pub fn from_rows(rows: [[f64; 3]; 2]) -> Self {
        let [[a, b, c], [d, e, f]] = rows;
        Self {
            m: Matrix2x3::new(a, b, c, d, e, f),
        }
    }

    fn from_parts(rot: Matrix2<f64>, translation: Vector2<f64>) -> Self {
        Self::from_rows([
            [rot[(0, 0)], rot[(0, 1)], translation.x],
            [rot[(1, 0)], rot[(1, 1)], translation.y],
        ])
    }

    /// Returns the two row vectors of the transform.
    pub fn rows(&self) -> [[f64; 3]; 2] {
        let m = &self.m;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        ]
    }

    fn rotation_part(&self) -> Matrix2<f64> {
        let m = &self.m;
        Matrix2::new(m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)])
    }

    fn translation_part(&self) -> Vector2<f64> {
        Vector2::new(self.m[(0, 2)], self.m[(1, 2)])
    }

    /// Applies the transform to a homogeneous point `[x, y, w]`.
    ///
    /// Each output component is the dot product of the point with one row of the matrix.
    pub fn apply_homogeneous(&self, point: [f64; 3]) -> Point2<f64> {
        Point2::from(self.m * Vector3::from(point))
    }

    /// Applies the transform to a point (with an implicit homogeneous `w` of 1).
    pub fn rotate_point(&self, point: impl Into<Point2<f64>>) -> Point2<f64> {
        let p = point.into();
        self.apply_homogeneous([p.x, p.y, 1.0])
    }

    /// Computes the inverse transform.
    ///
    /// The rotation part is orthonormal, so its inverse is its transpose; the translation is
    /// rotated back and negated.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let rot_t = self.rotation_part().transpose();
        let translation = -(rot_t * self.translation_part());
        Self::from_parts(rot_t, translation)
    }

    /// Returns the transform that first applies `self`, then `next`.
    #[must_use]
    pub fn then(&self, next: &RotationMatrix) -> Self {
        let rot = next.rotation_part() * self.rotation_part();
        let translation = next.rotation_part() * self.translation_part() + next.translation_part();
        Self::from_parts(rot, translation)
    }
}
