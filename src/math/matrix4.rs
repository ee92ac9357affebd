//! 4x4 homogeneous matrices

use std::ops::Mul;

use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};

use super::{Matrix3x3, Matrix3x4, Quaternion, Tolerance, Trs, Vector3, Vector4};

/// Column-major 4x4 matrix, the form world matrices are cached and handed
/// to a renderer in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix4x4 {
    cols: [Vector4; 4],
}

impl Matrix4x4 {
    /// Identity matrix.
    pub const IDENTITY: Self = Self::from_cols(
        Vector4::new(1.0, 0.0, 0.0, 0.0),
        Vector4::new(0.0, 1.0, 0.0, 0.0),
        Vector4::new(0.0, 0.0, 1.0, 0.0),
        Vector4::new(0.0, 0.0, 0.0, 1.0),
    );

    /// All zeros.
    pub const ZERO: Self = Self::from_cols(Vector4::ZERO, Vector4::ZERO, Vector4::ZERO, Vector4::ZERO);

    /// Create from four columns.
    #[must_use]
    #[inline]
    pub const fn from_cols(x_axis: Vector4, y_axis: Vector4, z_axis: Vector4, w_axis: Vector4) -> Self {
        Self {
            cols: [x_axis, y_axis, z_axis, w_axis],
        }
    }

    /// Create from a row-major array of rows.
    #[must_use]
    pub const fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Self::from_cols(
            Vector4::new(rows[0][0], rows[1][0], rows[2][0], rows[3][0]),
            Vector4::new(rows[0][1], rows[1][1], rows[2][1], rows[3][1]),
            Vector4::new(rows[0][2], rows[1][2], rows[2][2], rows[3][2]),
            Vector4::new(rows[0][3], rows[1][3], rows[2][3], rows[3][3]),
        )
    }

    /// Pure translation.
    #[must_use]
    pub const fn from_translation(translation: Vector3) -> Self {
        Self::from_affine(Matrix3x4::from_translation(translation))
    }

    /// Pure per-axis scale.
    #[must_use]
    pub const fn from_scale(scale: Vector3) -> Self {
        Self::from_affine(Matrix3x4::from_linear_translation(
            Matrix3x3::from_scale(scale),
            Vector3::ZERO,
        ))
    }

    /// Pure rotation.
    #[must_use]
    pub fn from_quaternion(rotation: Quaternion) -> Self {
        Self::from_affine(Matrix3x4::from_linear_translation(
            Matrix3x3::from_quaternion(rotation),
            Vector3::ZERO,
        ))
    }

    /// Embed an affine transform, adding the `(0, 0, 0, 1)` row.
    #[must_use]
    pub const fn from_affine(affine: Matrix3x4) -> Self {
        Self::from_cols(
            affine.col(0).extend(0.0),
            affine.col(1).extend(0.0),
            affine.col(2).extend(0.0),
            affine.col(3).extend(1.0),
        )
    }

    /// `T · R · S`: a point maps as `t + R·(s ⊙ p)`.
    #[must_use]
    pub fn trs(translation: Vector3, rotation: Quaternion, scale: Vector3) -> Self {
        Self::from_affine(Matrix3x4::trs(translation, rotation, scale))
    }

    /// The top three rows as an affine transform. The bottom row is
    /// discarded, so this is only lossless for affine matrices.
    #[must_use]
    pub const fn to_affine(&self) -> Matrix3x4 {
        Matrix3x4::from_cols(
            self.cols[0].truncate(),
            self.cols[1].truncate(),
            self.cols[2].truncate(),
            self.cols[3].truncate(),
        )
    }

    /// True if the bottom row is exactly `(0, 0, 0, 1)`.
    #[must_use]
    pub fn is_affine(&self) -> bool {
        self.row(3) == Vector4::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Element at `row`, `col`.
    #[must_use]
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cols[col][row]
    }

    /// Column `index`.
    #[must_use]
    #[inline]
    pub const fn col(&self, index: usize) -> Vector4 {
        self.cols[index]
    }

    /// Row `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Vector4 {
        Vector4::new(
            self.cols[0][index],
            self.cols[1][index],
            self.cols[2][index],
            self.cols[3][index],
        )
    }

    /// The translation column.
    #[must_use]
    #[inline]
    pub const fn translation(&self) -> Vector3 {
        self.cols[3].truncate()
    }

    /// Transposed copy.
    #[must_use]
    pub fn transpose(&self) -> Self {
        Self::from_cols(self.row(0), self.row(1), self.row(2), self.row(3))
    }

    /// Transform a point, assuming an affine matrix (no perspective divide).
    #[must_use]
    pub fn transform_point(&self, point: Vector3) -> Vector3 {
        (*self * point.extend(1.0)).truncate()
    }

    /// Transform a direction; translation is ignored.
    #[must_use]
    pub fn transform_vector(&self, vector: Vector3) -> Vector3 {
        (*self * vector.extend(0.0)).truncate()
    }

    /// Translation, rotation and scale of the affine part.
    ///
    /// See [`Matrix3x4::decompose_with`] for how reflections and degenerate
    /// axes are handled: any reflection comes back as a negative x scale.
    #[must_use]
    pub fn decompose(&self) -> Trs {
        self.to_affine().decompose()
    }

    /// [`Matrix4x4::decompose`] with explicit tolerances.
    #[must_use]
    pub fn decompose_with(&self, tolerance: &Tolerance) -> Trs {
        self.to_affine().decompose_with(tolerance)
    }

    /// True for an affine matrix whose linear part is a valid TRS.
    #[must_use]
    pub fn is_valid_trs(&self) -> bool {
        self.is_valid_trs_with(&Tolerance::DEFAULT)
    }

    /// [`Matrix4x4::is_valid_trs`] with explicit tolerances.
    #[must_use]
    pub fn is_valid_trs_with(&self, tolerance: &Tolerance) -> bool {
        self.is_affine() && self.to_affine().is_valid_trs_with(tolerance)
    }

    /// Determinant.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        let (s, c) = self.minors();
        s[0] * c[5] - s[1] * c[4] + s[2] * c[3] + s[3] * c[2] - s[4] * c[1] + s[5] * c[0]
    }

    /// General inverse, or `None` when the matrix is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let a = |row, col| self.get(row, col);
        let (s, c) = self.minors();

        let det = s[0] * c[5] - s[1] * c[4] + s[2] * c[3] + s[3] * c[2] - s[4] * c[1] + s[5] * c[0];
        if !det.is_finite() || det.abs() < f64::MIN_POSITIVE {
            return None;
        }
        let inv_det = 1.0 / det;

        let rows = [
            [
                a(1, 1) * c[5] - a(1, 2) * c[4] + a(1, 3) * c[3],
                -a(0, 1) * c[5] + a(0, 2) * c[4] - a(0, 3) * c[3],
                a(3, 1) * s[5] - a(3, 2) * s[4] + a(3, 3) * s[3],
                -a(2, 1) * s[5] + a(2, 2) * s[4] - a(2, 3) * s[3],
            ],
            [
                -a(1, 0) * c[5] + a(1, 2) * c[2] - a(1, 3) * c[1],
                a(0, 0) * c[5] - a(0, 2) * c[2] + a(0, 3) * c[1],
                -a(3, 0) * s[5] + a(3, 2) * s[2] - a(3, 3) * s[1],
                a(2, 0) * s[5] - a(2, 2) * s[2] + a(2, 3) * s[1],
            ],
            [
                a(1, 0) * c[4] - a(1, 1) * c[2] + a(1, 3) * c[0],
                -a(0, 0) * c[4] + a(0, 1) * c[2] - a(0, 3) * c[0],
                a(3, 0) * s[4] - a(3, 1) * s[2] + a(3, 3) * s[0],
                -a(2, 0) * s[4] + a(2, 1) * s[2] - a(2, 3) * s[0],
            ],
            [
                -a(1, 0) * c[3] + a(1, 1) * c[1] - a(1, 2) * c[0],
                a(0, 0) * c[3] - a(0, 1) * c[1] + a(0, 2) * c[0],
                -a(3, 0) * s[3] + a(3, 1) * s[1] - a(3, 2) * s[0],
                a(2, 0) * s[3] - a(2, 1) * s[1] + a(2, 2) * s[0],
            ],
        ];

        Some(Self::from_rows(rows.map(|row| row.map(|v| v * inv_det))))
    }

    /// 2x2 minors of the top two rows (`s`) and bottom two rows (`c`).
    fn minors(&self) -> ([f64; 6], [f64; 6]) {
        let a = |row, col| self.get(row, col);
        let s = [
            a(0, 0) * a(1, 1) - a(1, 0) * a(0, 1),
            a(0, 0) * a(1, 2) - a(1, 0) * a(0, 2),
            a(0, 0) * a(1, 3) - a(1, 0) * a(0, 3),
            a(0, 1) * a(1, 2) - a(1, 1) * a(0, 2),
            a(0, 1) * a(1, 3) - a(1, 1) * a(0, 3),
            a(0, 2) * a(1, 3) - a(1, 2) * a(0, 3),
        ];
        let c = [
            a(2, 0) * a(3, 1) - a(3, 0) * a(2, 1),
            a(2, 0) * a(3, 2) - a(3, 0) * a(2, 2),
            a(2, 0) * a(3, 3) - a(3, 0) * a(2, 3),
            a(2, 1) * a(3, 2) - a(3, 1) * a(2, 2),
            a(2, 1) * a(3, 3) - a(3, 1) * a(2, 3),
            a(2, 2) * a(3, 3) - a(3, 2) * a(2, 3),
        ];
        (s, c)
    }

    /// True when every element is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().all(|c| c.is_finite())
    }

    /// Elements in column-major order, the layout GPU uniform buffers expect.
    #[must_use]
    pub fn to_cols_array(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        for (chunk, col) in out.chunks_exact_mut(4).zip(&self.cols) {
            chunk.copy_from_slice(&col.to_array());
        }
        out
    }
}

impl Default for Matrix4x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Vector4> for Matrix4x4 {
    type Output = Vector4;

    #[inline]
    fn mul(self, v: Vector4) -> Vector4 {
        self.cols[0] * v.x + self.cols[1] * v.y + self.cols[2] * v.z + self.cols[3] * v.w
    }
}

impl Mul for Matrix4x4 {
    type Output = Self;

    /// The result applies `rhs` first.
    fn mul(self, rhs: Self) -> Self {
        Self::from_cols(
            self * rhs.cols[0],
            self * rhs.cols[1],
            self * rhs.cols[2],
            self * rhs.cols[3],
        )
    }
}

impl From<Matrix3x4> for Matrix4x4 {
    fn from(affine: Matrix3x4) -> Self {
        Self::from_affine(affine)
    }
}

impl From<Matrix3x3> for Matrix4x4 {
    fn from(linear: Matrix3x3) -> Self {
        Self::from_affine(Matrix3x4::from_linear_translation(linear, Vector3::ZERO))
    }
}

impl AbsDiffEq for Matrix4x4 {
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

impl RelativeEq for Matrix4x4 {
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

impl From<Matrix4x4> for glam::DMat4 {
    fn from(m: Matrix4x4) -> Self {
        Self::from_cols(m.cols[0].into(), m.cols[1].into(), m.cols[2].into(), m.cols[3].into())
    }
}

impl From<glam::DMat4> for Matrix4x4 {
    fn from(m: glam::DMat4) -> Self {
        Self::from_cols(m.x_axis.into(), m.y_axis.into(), m.z_axis.into(), m.w_axis.into())
    }
}
