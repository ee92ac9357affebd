//! 3x4 affine transforms: TRS composition and decomposition

use std::ops::Mul;

use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};

use super::{Matrix3x3, Quaternion, Tolerance, Trs, Vector3};

/// Column-major 3x4 matrix: a 3x3 linear part followed by a translation
/// column. Acts on points as if the implicit fourth row were `(0, 0, 0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix3x4 {
    cols: [Vector3; 4],
}

impl Matrix3x4 {
    /// Identity transform.
    pub const IDENTITY: Self = Self::from_cols(Vector3::X, Vector3::Y, Vector3::Z, Vector3::ZERO);

    /// Create from the three linear basis columns and the translation column.
    #[must_use]
    #[inline]
    pub const fn from_cols(x_axis: Vector3, y_axis: Vector3, z_axis: Vector3, translation: Vector3) -> Self {
        Self {
            cols: [x_axis, y_axis, z_axis, translation],
        }
    }

    /// Combine a linear map and a translation.
    #[must_use]
    pub const fn from_linear_translation(linear: Matrix3x3, translation: Vector3) -> Self {
        Self::from_cols(linear.col(0), linear.col(1), linear.col(2), translation)
    }

    /// Pure translation.
    #[must_use]
    pub const fn from_translation(translation: Vector3) -> Self {
        Self::from_cols(Vector3::X, Vector3::Y, Vector3::Z, translation)
    }

    /// `T · R · S`: a point maps as `t + R·(s ⊙ p)`.
    #[must_use]
    pub fn trs(translation: Vector3, rotation: Quaternion, scale: Vector3) -> Self {
        let r = Matrix3x3::from_quaternion(rotation);
        Self::from_cols(
            r.col(0) * scale.x,
            r.col(1) * scale.y,
            r.col(2) * scale.z,
            translation,
        )
    }

    /// The 3x3 linear part.
    #[must_use]
    pub const fn linear(&self) -> Matrix3x3 {
        Matrix3x3::from_cols(self.cols[0], self.cols[1], self.cols[2])
    }

    /// The translation column.
    #[must_use]
    #[inline]
    pub const fn translation(&self) -> Vector3 {
        self.cols[3]
    }

    /// Column `index` (0..=2 linear basis, 3 translation).
    #[must_use]
    #[inline]
    pub const fn col(&self, index: usize) -> Vector3 {
        self.cols[index]
    }

    /// Element at `row` (0..3), `col` (0..4).
    #[must_use]
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cols[col][row]
    }

    /// Transform a point (translation applies).
    #[must_use]
    #[inline]
    pub fn transform_point(&self, point: Vector3) -> Vector3 {
        self.linear() * point + self.cols[3]
    }

    /// Transform a direction (translation ignored).
    #[must_use]
    #[inline]
    pub fn transform_vector(&self, vector: Vector3) -> Vector3 {
        self.linear() * vector
    }

    /// Inverse transform, or `None` if the linear part is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let linear = self.linear().inverse()?;
        Some(Self::from_linear_translation(linear, -(linear * self.cols[3])))
    }

    // -------------------------------------------------------------------------
    // Decomposition
    // -------------------------------------------------------------------------

    /// Split into translation, rotation and per-axis scale with the default
    /// tolerances.
    ///
    /// Any reflection is reported as a negative x scale; see
    /// [`Matrix3x4::decompose_with`].
    #[must_use]
    pub fn decompose(&self) -> Trs {
        self.decompose_with(&Tolerance::DEFAULT)
    }

    /// Split into translation, rotation and per-axis scale.
    ///
    /// Translation is copied from the matrix. Scale is the length of each
    /// basis column; a negative determinant negates the x scale so the
    /// rotation stays proper. A reflection is always reported on x, so a
    /// matrix built with a negative y or z scale decomposes into a different
    /// `(rotation, scale)` pair than the one it was built from. Recomposing
    /// that pair gives back the same matrix.
    ///
    /// A near-zero axis is reported with a warning: the rotation is rebuilt
    /// from the remaining axes and is only as meaningful as they are.
    #[must_use]
    pub fn decompose_with(&self, tolerance: &Tolerance) -> Trs {
        let [x, y, z, translation] = self.cols;
        let mut scale = Vector3::new(x.magnitude(), y.magnitude(), z.magnitude());

        let degenerate = [scale.x, scale.y, scale.z].map(|s| !s.is_finite() || s < tolerance.normalize);
        let rotation = match degenerate {
            [false, false, false] => {
                if self.linear().determinant() < 0.0 {
                    scale.x = -scale.x;
                }
                Matrix3x3::from_cols(x / scale.x, y / scale.y, z / scale.z).to_quaternion()
            }
            [true, false, false] => {
                log::warn!("decompose: degenerate x scale {}", scale.x);
                let (y, z) = (y / scale.y, z / scale.z);
                Matrix3x3::from_cols(y.cross(z), y, z).to_quaternion()
            }
            [false, true, false] => {
                log::warn!("decompose: degenerate y scale {}", scale.y);
                let (x, z) = (x / scale.x, z / scale.z);
                Matrix3x3::from_cols(x, z.cross(x), z).to_quaternion()
            }
            [false, false, true] => {
                log::warn!("decompose: degenerate z scale {}", scale.z);
                let (x, y) = (x / scale.x, y / scale.y);
                Matrix3x3::from_cols(x, y, x.cross(y)).to_quaternion()
            }
            _ => {
                log::warn!("decompose: scale {scale:?} has two or more degenerate axes, rotation reset to identity");
                Quaternion::IDENTITY
            }
        };

        Trs {
            translation,
            rotation: rotation.normalized().unwrap_or(Quaternion::IDENTITY),
            scale,
        }
    }

    /// True if the linear part is a rotation times a non-degenerate,
    /// shear-free per-axis scale, using the default tolerances.
    #[must_use]
    pub fn is_valid_trs(&self) -> bool {
        self.is_valid_trs_with(&Tolerance::DEFAULT)
    }

    /// True if the basis columns are finite, longer than
    /// `tolerance.normalize` and pairwise orthogonal within
    /// `tolerance.orthogonality` (compared as cosines, so the result is
    /// independent of scale and of a reflection sign).
    #[must_use]
    pub fn is_valid_trs_with(&self, tolerance: &Tolerance) -> bool {
        let [x, y, z, translation] = self.cols;
        if !translation.is_finite() {
            return false;
        }

        let axes = [x, y, z];
        let lengths = axes.map(Vector3::magnitude);
        if lengths.iter().any(|l| !l.is_finite() || *l <= tolerance.normalize) {
            return false;
        }

        [(0, 1), (0, 2), (1, 2)].iter().all(|&(i, j)| {
            axes[i].dot(axes[j]).abs() <= tolerance.orthogonality * lengths[i] * lengths[j]
        })
    }

    /// True when every element is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().all(|c| c.is_finite())
    }
}

impl Default for Matrix3x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Matrix3x4 {
    type Output = Self;

    /// Affine composition; the result applies `rhs` first.
    fn mul(self, rhs: Self) -> Self {
        let linear = self.linear();
        Self::from_cols(
            linear * rhs.cols[0],
            linear * rhs.cols[1],
            linear * rhs.cols[2],
            self.transform_point(rhs.cols[3]),
        )
    }
}

impl Mul<Vector3> for Matrix3x4 {
    type Output = Vector3;

    /// Transforms `rhs` as a point.
    fn mul(self, rhs: Vector3) -> Vector3 {
        self.transform_point(rhs)
    }
}

impl AbsDiffEq for Matrix3x4 {
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

impl RelativeEq for Matrix3x4 {
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

impl From<Matrix3x4> for glam::DAffine3 {
    fn from(m: Matrix3x4) -> Self {
        Self::from_mat3_translation(m.linear().into(), m.translation().into())
    }
}

impl From<glam::DAffine3> for Matrix3x4 {
    fn from(a: glam::DAffine3) -> Self {
        Self::from_linear_translation(a.matrix3.into(), a.translation.into())
    }
}
