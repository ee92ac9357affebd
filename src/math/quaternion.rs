//! Rotation quaternions and Euler angle conversion

use std::ops::{Mul, Neg};

use approx::AbsDiffEq;
use serde::{Deserialize, Serialize};

use super::{Matrix3x3, MathError, Tolerance, Vector3, Vector4, clamp_unit};

/// A rotation quaternion `(x, y, z, w)` with `w` the scalar part.
///
/// Operations assume unit norm; [`Quaternion::normalized`] restores it after
/// accumulated rounding. `a * b` applies `b` first, then `a`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    /// Vector part, x
    pub x: f64,
    /// Vector part, y
    pub y: f64,
    /// Vector part, z
    pub z: f64,
    /// Scalar part
    pub w: f64,
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Self = Self::from_xyzw(0.0, 0.0, 0.0, 1.0);

    /// Create from raw components. No normalization is performed.
    #[must_use]
    #[inline]
    pub const fn from_xyzw(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians around `axis`.
    ///
    /// # Errors
    ///
    /// Returns [`MathError::DegenerateVector`] if `axis` has zero length.
    pub fn from_axis_angle(axis: Vector3, angle: f64) -> Result<Self, MathError> {
        let axis = axis.normalized()?;
        let (sin, cos) = (angle * 0.5).sin_cos();
        Ok(Self::from_xyzw(axis.x * sin, axis.y * sin, axis.z * sin, cos))
    }

    /// Rotation around the X axis.
    #[must_use]
    pub fn from_rotation_x(angle: f64) -> Self {
        let (sin, cos) = (angle * 0.5).sin_cos();
        Self::from_xyzw(sin, 0.0, 0.0, cos)
    }

    /// Rotation around the Y axis.
    #[must_use]
    pub fn from_rotation_y(angle: f64) -> Self {
        let (sin, cos) = (angle * 0.5).sin_cos();
        Self::from_xyzw(0.0, sin, 0.0, cos)
    }

    /// Rotation around the Z axis.
    #[must_use]
    pub fn from_rotation_z(angle: f64) -> Self {
        let (sin, cos) = (angle * 0.5).sin_cos();
        Self::from_xyzw(0.0, 0.0, sin, cos)
    }

    // -------------------------------------------------------------------------
    // Euler angles
    // -------------------------------------------------------------------------

    /// Intrinsic X-Y-Z rotation: rotate by `a` about X, then `b` about the
    /// new Y, then `c` about the newest Z (`Rx(a)·Ry(b)·Rz(c)`).
    ///
    /// `b` is the axis subject to gimbal lock.
    #[must_use]
    pub fn from_euler_radians(a: f64, b: f64, c: f64) -> Self {
        Self::from_rotation_x(a) * Self::from_rotation_y(b) * Self::from_rotation_z(c)
    }

    /// Same as [`Quaternion::from_euler_radians`] with the components
    /// reordered as `(pitch, yaw, roll)`.
    #[must_use]
    pub fn from_yaw_pitch_roll(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self::from_euler_radians(pitch, yaw, roll)
    }

    /// Recover `(a, b, c)` such that `from_euler_radians(a, b, c)` is this
    /// rotation.
    ///
    /// `a` and `c` lie in `[-π, π]`, `b` in `[-π/2, π/2]`. At gimbal lock
    /// (`b ≈ ±π/2`) only the sum or difference of `a` and `c` is determined;
    /// `c` is then fixed at zero.
    #[must_use]
    pub fn to_euler_radians(self) -> (f64, f64, f64) {
        self.to_euler_radians_with(&Tolerance::DEFAULT)
    }

    /// [`Quaternion::to_euler_radians`] with an explicit gimbal threshold.
    #[must_use]
    pub fn to_euler_radians_with(self, tolerance: &Tolerance) -> (f64, f64, f64) {
        let m = Matrix3x3::from_quaternion(self);

        let sin_b = clamp_unit(m.get(0, 2));
        let b = sin_b.asin();

        if b.cos() > tolerance.gimbal {
            let a = (-m.get(1, 2)).atan2(m.get(2, 2));
            let c = (-m.get(0, 1)).atan2(m.get(0, 0));
            (a, b, c)
        } else {
            // With c = 0 the remaining column gives sin(a ± c) and cos(a ± c)
            let a = m.get(2, 1).atan2(m.get(1, 1));
            (a, b, 0.0)
        }
    }

    /// Inverse of [`Quaternion::from_yaw_pitch_roll`], returned as
    /// `(yaw, pitch, roll)`.
    #[must_use]
    pub fn to_yaw_pitch_roll(self) -> (f64, f64, f64) {
        let (pitch, yaw, roll) = self.to_euler_radians();
        (yaw, pitch, roll)
    }

    // -------------------------------------------------------------------------
    // Algebra
    // -------------------------------------------------------------------------

    /// 4D dot product.
    #[must_use]
    #[inline]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Euclidean norm of the four components.
    #[must_use]
    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit-norm copy.
    ///
    /// # Errors
    ///
    /// Returns [`MathError::DegenerateVector`] for a (numerically) zero
    /// quaternion.
    pub fn normalized(self) -> Result<Self, MathError> {
        let v = Vector4::from(self).normalized()?;
        Ok(Self::from(v))
    }

    /// Conjugate, the inverse of a unit quaternion.
    #[must_use]
    #[inline]
    pub fn conjugate(self) -> Self {
        Self::from_xyzw(-self.x, -self.y, -self.z, self.w)
    }

    /// Inverse rotation (assumes unit norm).
    #[must_use]
    #[inline]
    pub fn inverse(self) -> Self {
        self.conjugate()
    }

    /// Rotate a vector, `q · v · q*`.
    #[must_use]
    pub fn rotate_vector(self, v: Vector3) -> Vector3 {
        let u = Vector3::new(self.x, self.y, self.z);
        let t = u.cross(v) * 2.0;
        v + t * self.w + u.cross(t)
    }

    /// Angle in radians of the relative rotation `self · conj(other)`, i.e.
    /// `2·acos(clamp(|dot(self, other)|, 0, 1))`.
    ///
    /// Sign-insensitive: `q` and `-q` are zero radians apart. Evaluated as
    /// `2·atan2(|r.xyz|, |r.w|)`, which keeps precision for nearly equal
    /// rotations where `acos` near 1 does not.
    #[must_use]
    pub fn angle_to(self, other: Self) -> f64 {
        let relative = self * other.conjugate();
        let sin_half = Vector3::new(relative.x, relative.y, relative.z).magnitude();
        2.0 * sin_half.atan2(relative.w.abs())
    }

    /// True if both quaternions represent the same rotation within `epsilon`
    /// radians.
    #[must_use]
    pub fn rotation_eq(self, other: Self, epsilon: f64) -> bool {
        self.angle_to(other) <= epsilon
    }

    /// True when every component is finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        Vector4::from(self).is_finite()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Quaternion {
    type Output = Self;

    /// Hamilton product; the result applies `rhs` first.
    fn mul(self, rhs: Self) -> Self {
        Self::from_xyzw(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

impl Mul<Vector3> for Quaternion {
    type Output = Vector3;

    fn mul(self, rhs: Vector3) -> Vector3 {
        self.rotate_vector(rhs)
    }
}

impl Neg for Quaternion {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_xyzw(-self.x, -self.y, -self.z, -self.w)
    }
}

impl From<Quaternion> for Vector4 {
    fn from(q: Quaternion) -> Self {
        Self::new(q.x, q.y, q.z, q.w)
    }
}

impl From<Vector4> for Quaternion {
    fn from(v: Vector4) -> Self {
        Self::from_xyzw(v.x, v.y, v.z, v.w)
    }
}

impl From<Quaternion> for glam::DQuat {
    fn from(q: Quaternion) -> Self {
        Self::from_xyzw(q.x, q.y, q.z, q.w)
    }
}

impl From<glam::DQuat> for Quaternion {
    fn from(q: glam::DQuat) -> Self {
        Self::from_xyzw(q.x, q.y, q.z, q.w)
    }
}

/// Compares rotations, not components: `epsilon` is an angle in radians.
impl AbsDiffEq for Quaternion {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        1e-9
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.rotation_eq(*other, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::{FRAC_PI_2, PI};

    const ANGLES: [f64; 9] = [-3.0, -2.2, -1.3, -0.4, 0.0, 0.35, 1.1, 2.05, 3.1];
    const MIDDLE_ANGLES: [f64; 7] = [-1.5, -1.1, -0.6, 0.0, 0.45, 1.2, 1.55];

    #[test]
    fn test_identity_and_axis_rotation() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(Quaternion::IDENTITY * v, v);

        // 90° about Y takes +X to -Z in a right-handed frame
        let q = Quaternion::from_rotation_y(FRAC_PI_2);
        assert_relative_eq!(q * Vector3::X, -Vector3::Z, epsilon = 1e-12);

        let axis = Quaternion::from_axis_angle(Vector3::new(0.0, 2.0, 0.0), FRAC_PI_2).unwrap();
        assert_abs_diff_eq!(axis, q);
        assert!(Quaternion::from_axis_angle(Vector3::ZERO, 1.0).is_err());
    }

    #[test]
    fn test_composition_applies_right_operand_first() {
        let a = Quaternion::from_rotation_z(FRAC_PI_2);
        let b = Quaternion::from_rotation_x(FRAC_PI_2);
        let v = Vector3::Y;

        // b first: Y -> Z, then a (about Z) leaves Z alone
        assert_relative_eq!((a * b) * v, a * (b * v), epsilon = 1e-12);
        assert_relative_eq!((a * b) * v, Vector3::Z, epsilon = 1e-12);
        // Non-commutative
        assert!(!(a * b).rotation_eq(b * a, 1e-6));
    }

    #[test]
    fn test_rotation_equality_ignores_sign() {
        let q = Quaternion::from_euler_radians(0.3, -0.7, 1.9);
        assert!(q.rotation_eq(-q, 1e-12));
        assert!(q.angle_to(-q) < 1e-7);

        let p = Quaternion::from_rotation_x(0.25) * q;
        assert_relative_eq!(p.angle_to(q), 0.25, epsilon = 1e-7);
    }

    #[test]
    fn test_normalized() {
        let q = Quaternion::from_xyzw(0.0, 0.0, 2.0, 2.0).normalized().unwrap();
        assert_relative_eq!(q.norm(), 1.0, epsilon = 1e-15);
        assert!(matches!(
            Quaternion::from_xyzw(0.0, 0.0, 0.0, 0.0).normalized(),
            Err(MathError::DegenerateVector { .. })
        ));
    }

    #[test]
    fn test_inverse() {
        let q = Quaternion::from_euler_radians(1.0, 0.5, -2.0);
        assert_abs_diff_eq!(q * q.inverse(), Quaternion::IDENTITY);
    }

    #[test]
    fn test_euler_round_trip() {
        for &a in &ANGLES {
            for &b in &MIDDLE_ANGLES {
                for &c in &ANGLES {
                    let q = Quaternion::from_euler_radians(a, b, c);
                    let (a2, b2, c2) = q.to_euler_radians();
                    let q2 = Quaternion::from_euler_radians(a2, b2, c2);

                    assert!(q.rotation_eq(q2, 1e-9), "({a}, {b}, {c}) -> ({a2}, {b2}, {c2})");
                    assert!((super::super::wrap_angle(a2 - a)).abs() < 1e-9);
                    assert!((b2 - b).abs() < 1e-9);
                    assert!((super::super::wrap_angle(c2 - c)).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_gimbal_lock_boundary() {
        for &b in &[FRAC_PI_2, -FRAC_PI_2] {
            for &a in &ANGLES {
                for &c in &ANGLES {
                    let q = Quaternion::from_euler_radians(a, b, c);
                    let (a2, b2, c2) = q.to_euler_radians();

                    assert!(!b2.is_nan());
                    assert!((b2 - b).abs() < 1e-6, "b = {b} recovered as {b2}");
                    assert_eq!(c2, 0.0);

                    let q2 = Quaternion::from_euler_radians(a2, b2, c2);
                    assert!(q.rotation_eq(q2, 1e-6), "({a}, {b}, {c}) -> ({a2}, {b2}, {c2})");
                }
            }
        }
    }

    #[test]
    fn test_euler_output_bounds() {
        let inputs = [-7.5, -PI, -2.0, -FRAC_PI_2, -0.3, 0.0, 0.9, FRAC_PI_2, PI, 4.4, 9.0];
        for &a in &inputs {
            for &b in &inputs {
                for &c in &inputs {
                    let (a2, b2, c2) = Quaternion::from_euler_radians(a, b, c).to_euler_radians();
                    assert!((-PI..=PI).contains(&a2));
                    assert!((-FRAC_PI_2..=FRAC_PI_2).contains(&b2));
                    assert!((-PI..=PI).contains(&c2));
                }
            }
        }
    }

    #[test]
    fn test_unnormalized_input_does_not_produce_nan() {
        // Slightly over-length quaternion pushes m02 past 1.0 without the clamp
        let q = Quaternion::from_euler_radians(0.2, FRAC_PI_2, 0.0);
        let inflated = Quaternion::from_xyzw(q.x * 1.000_001, q.y * 1.000_001, q.z, q.w);
        let (a, b, c) = inflated.to_euler_radians();
        assert!(a.is_finite() && b.is_finite() && c.is_finite());
        assert!((b - FRAC_PI_2).abs() < 1e-2);
    }

    #[test]
    fn test_yaw_pitch_roll_reorders_components() {
        let (yaw, pitch, roll) = (0.8, -0.3, 1.7);
        let q = Quaternion::from_yaw_pitch_roll(yaw, pitch, roll);
        assert_eq!(q, Quaternion::from_euler_radians(pitch, yaw, roll));

        let (yaw2, pitch2, roll2) = q.to_yaw_pitch_roll();
        assert_relative_eq!(yaw2, yaw, epsilon = 1e-9);
        assert_relative_eq!(pitch2, pitch, epsilon = 1e-9);
        assert_relative_eq!(roll2, roll, epsilon = 1e-9);
    }

    #[test]
    fn test_matches_glam_composition() {
        let (a, b, c) = (0.3, -1.1, 2.4);
        let ours = Quaternion::from_euler_radians(a, b, c);
        let theirs = glam::DQuat::from_rotation_x(a)
            * glam::DQuat::from_rotation_y(b)
            * glam::DQuat::from_rotation_z(c);

        assert_abs_diff_eq!(ours, Quaternion::from(theirs), epsilon = 1e-12);

        let v = glam::DVec3::new(0.4, -1.0, 2.5);
        let rotated: glam::DVec3 = (ours * Vector3::from(v)).into();
        assert!((rotated - theirs * v).length() < 1e-12);
    }
}
