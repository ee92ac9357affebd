//! Decomposed translation / rotation / scale

use serde::{Deserialize, Serialize};

use super::{Matrix3x4, Matrix4x4, Quaternion, Vector3};

/// A transform as separate translation, rotation and per-axis scale,
/// composed as `T · R · S`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trs {
    /// Translation
    pub translation: Vector3,
    /// Rotation
    pub rotation: Quaternion,
    /// Per-axis scale
    pub scale: Vector3,
}

impl Trs {
    /// No translation, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        translation: Vector3::ZERO,
        rotation: Quaternion::IDENTITY,
        scale: Vector3::ONE,
    };

    /// Create from parts.
    #[must_use]
    pub const fn new(translation: Vector3, rotation: Quaternion, scale: Vector3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Compose into an affine matrix.
    #[must_use]
    pub fn to_affine(&self) -> Matrix3x4 {
        Matrix3x4::trs(self.translation, self.rotation, self.scale)
    }

    /// Compose into a 4x4 matrix.
    #[must_use]
    pub fn to_matrix(&self) -> Matrix4x4 {
        Matrix4x4::trs(self.translation, self.rotation, self.scale)
    }
}

impl Default for Trs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Trs> for Matrix4x4 {
    fn from(trs: Trs) -> Self {
        trs.to_matrix()
    }
}
