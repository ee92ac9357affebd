//! Linear-algebra kernel
//!
//! Double-precision value types used by the transform hierarchy:
//! vectors, quaternions, 3x3 / 3x4 / 4x4 column-major matrices and the
//! decomposed [`Trs`] form.
//!
//! Conventions:
//!
//! - Matrices are column-major and multiply column vectors (`M * v`).
//! - `a * b` for both quaternions and matrices applies `b` first.
//! - A TRS matrix is `T · R · S`, so a point maps as `t + R·(s ⊙ p)`.

mod affine;
mod matrix3;
mod matrix4;
mod quaternion;
mod trs;
mod vector;

pub use affine::Matrix3x4;
pub use matrix3::Matrix3x3;
pub use matrix4::Matrix4x4;
pub use quaternion::Quaternion;
pub use trs::Trs;
pub use vector::{Vector2, Vector3, Vector4};

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Errors produced by the math kernel
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum MathError {
    /// Normalization of a vector (or quaternion) whose length is numerically zero
    #[error("cannot normalize a degenerate vector (magnitude {magnitude:e})")]
    DegenerateVector {
        /// Magnitude of the rejected vector
        magnitude: f64,
    },
}

// ============================================================================
// Tolerances
// ============================================================================

/// Numerical thresholds used by normalization, decomposition and Euler
/// extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Minimum magnitude a vector (or basis column) may have to be normalized.
    pub normalize: f64,
    /// Maximum cosine between two basis columns still considered orthogonal.
    pub orthogonality: f64,
    /// `cos(b)` at or below this value is treated as gimbal lock.
    pub gimbal: f64,
}

impl Tolerance {
    /// Defaults: a machine-epsilon scaled normalize threshold.
    pub const DEFAULT: Self = Self {
        normalize: 16.0 * f64::EPSILON,
        orthogonality: 1e-6,
        gimbal: 1e-6,
    };
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// Scalar helpers
// ============================================================================

/// Clamp an `asin`/`acos` argument into `[-1, 1]`.
///
/// Rounding can push a value derived from a unit matrix or quaternion
/// slightly outside the domain; the clamp keeps that from becoming `NaN`.
#[inline]
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if !(-1.0..=1.0).contains(&value) {
        log::trace!("domain clamp: {value} outside [-1, 1]");
    }
    value.clamp(-1.0, 1.0)
}

/// Wrap an angle in radians into `[-π, π]`.
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    if (-PI..=PI).contains(&angle) {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid maps exactly onto -π; keep the sign of the input at the seam
    if wrapped == -PI && angle > 0.0 { PI } else { wrapped }
}
