//! 3x3 linear maps

use std::ops::Mul;

use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};

use super::{Quaternion, Vector3};

/// Column-major 3x3 matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix3x3 {
    cols: [Vector3; 3],
}

impl Matrix3x3 {
    /// Identity matrix.
    pub const IDENTITY: Self = Self::from_cols(Vector3::X, Vector3::Y, Vector3::Z);

    /// All zeros.
    pub const ZERO: Self = Self::from_cols(Vector3::ZERO, Vector3::ZERO, Vector3::ZERO);

    /// Create from three basis columns.
    #[must_use]
    #[inline]
    pub const fn from_cols(x_axis: Vector3, y_axis: Vector3, z_axis: Vector3) -> Self {
        Self {
            cols: [x_axis, y_axis, z_axis],
        }
    }

    /// Create from a row-major array of rows, which reads like the written
    /// matrix.
    #[must_use]
    pub const fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self::from_cols(
            Vector3::new(rows[0][0], rows[1][0], rows[2][0]),
            Vector3::new(rows[0][1], rows[1][1], rows[2][1]),
            Vector3::new(rows[0][2], rows[1][2], rows[2][2]),
        )
    }

    /// Diagonal (non-uniform scale) matrix.
    #[must_use]
    pub const fn from_scale(scale: Vector3) -> Self {
        Self::from_cols(
            Vector3::new(scale.x, 0.0, 0.0),
            Vector3::new(0.0, scale.y, 0.0),
            Vector3::new(0.0, 0.0, scale.z),
        )
    }

    /// Rotation matrix of a unit quaternion.
    #[must_use]
    pub fn from_quaternion(q: Quaternion) -> Self {
        let (x2, y2, z2) = (q.x + q.x, q.y + q.y, q.z + q.z);
        let (xx, yy, zz) = (q.x * x2, q.y * y2, q.z * z2);
        let (xy, xz, yz) = (q.x * y2, q.x * z2, q.y * z2);
        let (wx, wy, wz) = (q.w * x2, q.w * y2, q.w * z2);

        Self::from_cols(
            Vector3::new(1.0 - (yy + zz), xy + wz, xz - wy),
            Vector3::new(xy - wz, 1.0 - (xx + zz), yz + wx),
            Vector3::new(xz + wy, yz - wx, 1.0 - (xx + yy)),
        )
    }

    /// Convert an orthonormal rotation matrix to a quaternion.
    ///
    /// Branches on the trace: with a positive trace `w` is the pivot,
    /// otherwise the largest diagonal entry picks the pivot axis so the
    /// divisor never approaches zero (rotations near 180°).
    #[must_use]
    pub fn to_quaternion(&self) -> Quaternion {
        let m = |row, col| self.get(row, col);
        let trace = m(0, 0) + m(1, 1) + m(2, 2);

        if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Quaternion::from_xyzw(
                (m(2, 1) - m(1, 2)) / s,
                (m(0, 2) - m(2, 0)) / s,
                (m(1, 0) - m(0, 1)) / s,
                0.25 * s,
            )
        } else if m(0, 0) > m(1, 1) && m(0, 0) > m(2, 2) {
            let s = (1.0 + m(0, 0) - m(1, 1) - m(2, 2)).sqrt() * 2.0;
            Quaternion::from_xyzw(
                0.25 * s,
                (m(0, 1) + m(1, 0)) / s,
                (m(0, 2) + m(2, 0)) / s,
                (m(2, 1) - m(1, 2)) / s,
            )
        } else if m(1, 1) > m(2, 2) {
            let s = (1.0 + m(1, 1) - m(0, 0) - m(2, 2)).sqrt() * 2.0;
            Quaternion::from_xyzw(
                (m(0, 1) + m(1, 0)) / s,
                0.25 * s,
                (m(1, 2) + m(2, 1)) / s,
                (m(0, 2) - m(2, 0)) / s,
            )
        } else {
            let s = (1.0 + m(2, 2) - m(0, 0) - m(1, 1)).sqrt() * 2.0;
            Quaternion::from_xyzw(
                (m(0, 2) + m(2, 0)) / s,
                (m(1, 2) + m(2, 1)) / s,
                0.25 * s,
                (m(1, 0) - m(0, 1)) / s,
            )
        }
    }

    /// Element at `row`, `col`.
    #[must_use]
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cols[col][row]
    }

    /// Basis column `index`.
    #[must_use]
    #[inline]
    pub const fn col(&self, index: usize) -> Vector3 {
        self.cols[index]
    }

    /// Row `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Vector3 {
        Vector3::new(
            self.cols[0][index],
            self.cols[1][index],
            self.cols[2][index],
        )
    }

    /// Transposed copy.
    #[must_use]
    pub fn transpose(&self) -> Self {
        Self::from_cols(self.row(0), self.row(1), self.row(2))
    }

    /// Determinant; negative for a reflection.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.cols[0].dot(self.cols[1].cross(self.cols[2]))
    }

    /// Inverse, or `None` when the matrix is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let [x, y, z] = self.cols;
        let det = self.determinant();
        if !det.is_finite() || det.abs() < f64::MIN_POSITIVE {
            return None;
        }

        // Rows of the inverse are the cross products of column pairs
        let inv_det = 1.0 / det;
        Some(Self::from_cols(y.cross(z) * inv_det, z.cross(x) * inv_det, x.cross(y) * inv_det).transpose())
    }

    /// True when every element is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().all(|c| c.is_finite())
    }
}

impl Default for Matrix3x3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Vector3> for Matrix3x3 {
    type Output = Vector3;

    #[inline]
    fn mul(self, v: Vector3) -> Vector3 {
        self.cols[0] * v.x + self.cols[1] * v.y + self.cols[2] * v.z
    }
}

impl Mul for Matrix3x3 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::from_cols(self * rhs.cols[0], self * rhs.cols[1], self * rhs.cols[2])
    }
}

impl AbsDiffEq for Matrix3x3 {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.cols
            .iter()
            .zip(&other.cols)
            .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl RelativeEq for Matrix3x3 {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.cols
            .iter()
            .zip(&other.cols)
            .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}

impl From<Matrix3x3> for glam::DMat3 {
    fn from(m: Matrix3x3) -> Self {
        Self::from_cols(m.cols[0].into(), m.cols[1].into(), m.cols[2].into())
    }
}

impl From<glam::DMat3> for Matrix3x3 {
    fn from(m: glam::DMat3) -> Self {
        Self::from_cols(m.x_axis.into(), m.y_axis.into(), m.z_axis.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::PI;

    #[test]
    fn test_from_rows_layout() {
        let m = Matrix3x3::from_rows([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        assert_eq!(m.get(0, 1), 2.0);
        assert_eq!(m.get(2, 0), 7.0);
        assert_eq!(m.col(0), Vector3::new(1.0, 4.0, 7.0));
        assert_eq!(m.row(1), Vector3::new(4.0, 5.0, 6.0));
        assert_eq!(m.transpose().row(0), m.col(0));
    }

    #[test]
    fn test_quaternion_matrix_round_trip() {
        let rotations = [
            Quaternion::IDENTITY,
            Quaternion::from_euler_radians(0.3, -1.1, 2.4),
            Quaternion::from_euler_radians(-2.9, 0.2, -0.1),
            Quaternion::from_euler_radians(1.4, 1.5, -3.0),
        ];
        for q in rotations {
            let m = Matrix3x3::from_quaternion(q);
            assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(m.to_quaternion(), q, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_to_quaternion_every_branch_near_half_turn() {
        // 180° turns have trace -1 and exercise the three diagonal pivots
        for axis in [Vector3::X, Vector3::Y, Vector3::Z, Vector3::new(1.0, 1.0, 0.0)] {
            for angle in [PI, PI - 1e-7, -PI + 1e-4, 2.9] {
                let q = Quaternion::from_axis_angle(axis, angle).unwrap();
                let back = Matrix3x3::from_quaternion(q).to_quaternion();
                assert!(back.is_finite());
                assert_relative_eq!(back.norm(), 1.0, epsilon = 1e-12);
                assert_abs_diff_eq!(back, q, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_matrix_vector_matches_quaternion_rotation() {
        let q = Quaternion::from_euler_radians(0.7, -0.2, 1.3);
        let v = Vector3::new(-1.0, 0.5, 2.0);
        assert_relative_eq!(Matrix3x3::from_quaternion(q) * v, q * v, epsilon = 1e-12);
    }

    #[test]
    fn test_associativity() {
        let a = Matrix3x3::from_rows([[1.0, -2.0, 0.5], [0.0, 3.0, 1.0], [2.0, 0.25, -1.0]]);
        let b = Matrix3x3::from_quaternion(Quaternion::from_euler_radians(0.4, 0.1, -0.9))
            * Matrix3x3::from_scale(Vector3::new(2.0, 0.5, 3.0));
        let v = Vector3::new(0.3, -4.0, 1.5);
        assert_relative_eq!((a * b) * v, a * (b * v), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse() {
        let m = Matrix3x3::from_rows([[2.0, 0.0, 1.0], [1.0, 3.0, 0.0], [0.0, -1.0, 4.0]]);
        let inv = m.inverse().unwrap();
        assert_relative_eq!(m * inv, Matrix3x3::IDENTITY, epsilon = 1e-12);
        assert_relative_eq!(inv * m, Matrix3x3::IDENTITY, epsilon = 1e-12);

        let singular = Matrix3x3::from_scale(Vector3::new(1.0, 0.0, 2.0));
        assert!(singular.inverse().is_none());
    }
}
