//! Fixed-size vectors

use std::ops::{Add, AddAssign, Div, Index, Mul, MulAssign, Neg, Sub, SubAssign};

use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};

use super::{MathError, Tolerance};

/// Implements the operations shared by every vector width.
macro_rules! impl_vector {
    ($name:ident { $($field:ident),+ }, $len:literal) => {
        impl $name {
            /// All components zero.
            pub const ZERO: Self = Self { $($field: 0.0),+ };
            /// All components one.
            pub const ONE: Self = Self { $($field: 1.0),+ };

            /// Create a vector with every component set to `value`.
            #[must_use]
            #[inline]
            pub const fn splat(value: f64) -> Self {
                Self { $($field: value),+ }
            }

            /// Dot product.
            #[must_use]
            #[inline]
            pub fn dot(self, other: Self) -> f64 {
                0.0 $(+ self.$field * other.$field)+
            }

            /// Squared length.
            #[must_use]
            #[inline]
            pub fn magnitude_squared(self) -> f64 {
                self.dot(self)
            }

            /// Length, `sqrt(dot(v, v))`.
            #[must_use]
            #[inline]
            pub fn magnitude(self) -> f64 {
                self.magnitude_squared().sqrt()
            }

            /// Unit-length copy of this vector.
            ///
            /// # Errors
            ///
            /// Returns [`MathError::DegenerateVector`] when the magnitude is
            /// below the default normalize tolerance.
            pub fn normalized(self) -> Result<Self, MathError> {
                self.normalized_with(Tolerance::DEFAULT.normalize)
            }

            /// Unit-length copy of this vector with a caller-supplied threshold.
            ///
            /// # Errors
            ///
            /// Returns [`MathError::DegenerateVector`] when the magnitude is
            /// below `epsilon` or not finite.
            pub fn normalized_with(self, epsilon: f64) -> Result<Self, MathError> {
                let magnitude = self.magnitude();
                if !magnitude.is_finite() || magnitude < epsilon {
                    return Err(MathError::DegenerateVector { magnitude });
                }
                Ok(self / magnitude)
            }

            /// Per-component (non-uniform) scale.
            #[must_use]
            #[inline]
            pub fn component_mul(self, other: Self) -> Self {
                Self { $($field: self.$field * other.$field),+ }
            }

            /// Per-component division.
            #[must_use]
            #[inline]
            pub fn component_div(self, other: Self) -> Self {
                Self { $($field: self.$field / other.$field),+ }
            }

            /// Apply `f` to every component.
            #[must_use]
            pub fn map(self, mut f: impl FnMut(f64) -> f64) -> Self {
                Self { $($field: f(self.$field)),+ }
            }

            /// True when every component is finite.
            #[must_use]
            pub fn is_finite(self) -> bool {
                true $(&& self.$field.is_finite())+
            }

            /// Components as an array.
            #[must_use]
            pub const fn to_array(self) -> [f64; $len] {
                [$(self.$field),+]
            }
        }

        impl Add for $name {
            type Output = Self;

            #[inline]
            fn add(self, rhs: Self) -> Self {
                Self { $($field: self.$field + rhs.$field),+ }
            }
        }

        impl AddAssign for $name {
            #[inline]
            fn add_assign(&mut self, rhs: Self) {
                *self = *self + rhs;
            }
        }

        impl Sub for $name {
            type Output = Self;

            #[inline]
            fn sub(self, rhs: Self) -> Self {
                Self { $($field: self.$field - rhs.$field),+ }
            }
        }

        impl SubAssign for $name {
            #[inline]
            fn sub_assign(&mut self, rhs: Self) {
                *self = *self - rhs;
            }
        }

        impl Neg for $name {
            type Output = Self;

            #[inline]
            fn neg(self) -> Self {
                Self { $($field: -self.$field),+ }
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;

            #[inline]
            fn mul(self, rhs: f64) -> Self {
                Self { $($field: self.$field * rhs),+ }
            }
        }

        impl Mul<$name> for f64 {
            type Output = $name;

            #[inline]
            fn mul(self, rhs: $name) -> $name {
                rhs * self
            }
        }

        impl MulAssign<f64> for $name {
            #[inline]
            fn mul_assign(&mut self, rhs: f64) {
                *self = *self * rhs;
            }
        }

        impl Div<f64> for $name {
            type Output = Self;

            #[inline]
            fn div(self, rhs: f64) -> Self {
                Self { $($field: self.$field / rhs),+ }
            }
        }

        impl Index<usize> for $name {
            type Output = f64;

            fn index(&self, index: usize) -> &f64 {
                let fields = [$(&self.$field),+];
                fields[index]
            }
        }

        impl From<[f64; $len]> for $name {
            fn from(array: [f64; $len]) -> Self {
                let [$($field),+] = array;
                Self { $($field),+ }
            }
        }

        impl From<$name> for [f64; $len] {
            fn from(v: $name) -> Self {
                v.to_array()
            }
        }

        impl AbsDiffEq for $name {
            type Epsilon = f64;

            fn default_epsilon() -> f64 {
                f64::default_epsilon()
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
                true $(&& self.$field.abs_diff_eq(&other.$field, epsilon))+
            }
        }

        impl RelativeEq for $name {
            fn default_max_relative() -> f64 {
                f64::default_max_relative()
            }

            fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
                true $(&& self.$field.relative_eq(&other.$field, epsilon, max_relative))+
            }
        }
    };
}

/// 2D vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
}

/// 3D vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

/// 4D vector, also used for homogeneous coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector4 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
    /// W component
    pub w: f64,
}

impl_vector!(Vector2 { x, y }, 2);
impl_vector!(Vector3 { x, y, z }, 3);
impl_vector!(Vector4 { x, y, z, w }, 4);

impl Vector2 {
    /// Create a new vector.
    #[must_use]
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Extend with a z component.
    #[must_use]
    pub const fn extend(self, z: f64) -> Vector3 {
        Vector3::new(self.x, self.y, z)
    }
}

impl Vector3 {
    /// Unit X axis
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    /// Unit Y axis
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    /// Unit Z axis
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Create a new vector.
    #[must_use]
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Cross product (right-handed).
    #[must_use]
    #[inline]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Extend with a w component.
    #[must_use]
    pub const fn extend(self, w: f64) -> Vector4 {
        Vector4::new(self.x, self.y, self.z, w)
    }

    /// Drop the z component.
    #[must_use]
    pub const fn truncate(self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }
}

impl Vector4 {
    /// Create a new vector.
    #[must_use]
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Drop the w component.
    #[must_use]
    pub const fn truncate(self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }
}

// ============================================================================
// glam interop
// ============================================================================

impl From<Vector2> for glam::DVec2 {
    fn from(v: Vector2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<glam::DVec2> for Vector2 {
    fn from(v: glam::DVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Vector3> for glam::DVec3 {
    fn from(v: Vector3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<glam::DVec3> for Vector3 {
    fn from(v: glam::DVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vector4> for glam::DVec4 {
    fn from(v: Vector4) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

impl From<glam::DVec4> for Vector4 {
    fn from(v: glam::DVec4) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_arithmetic() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(-4.0, 0.5, 2.0);

        assert_eq!(a + b, Vector3::new(-3.0, 2.5, 5.0));
        assert_eq!(a - b, Vector3::new(5.0, 1.5, 1.0));
        assert_eq!(a * 2.0, Vector3::new(2.0, 4.0, 6.0));
        assert_eq!(2.0 * a, a * 2.0);
        assert_eq!(-a, Vector3::new(-1.0, -2.0, -3.0));
        assert_eq!(a.component_mul(b), Vector3::new(-4.0, 1.0, 6.0));
        assert_eq!(a.dot(b), -4.0 + 1.0 + 6.0);
    }

    #[test]
    fn test_cross_product_is_right_handed() {
        assert_eq!(Vector3::X.cross(Vector3::Y), Vector3::Z);
        assert_eq!(Vector3::Y.cross(Vector3::Z), Vector3::X);
        assert_eq!(Vector3::Z.cross(Vector3::X), Vector3::Y);

        let a = Vector3::new(0.3, -1.2, 2.0);
        let b = Vector3::new(1.5, 0.1, -0.7);
        let c = a.cross(b);
        assert!(c.dot(a).abs() < 1e-12);
        assert!(c.dot(b).abs() < 1e-12);
    }

    #[test]
    fn test_magnitude_and_normalize() {
        let v = Vector3::new(3.0, 4.0, 12.0);
        assert_eq!(v.magnitude(), 13.0);

        let n = v.normalized().unwrap();
        assert_relative_eq!(n.magnitude(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(n, Vector3::new(3.0, 4.0, 12.0) / 13.0, epsilon = 1e-15);

        let v4 = Vector4::new(1.0, 1.0, 1.0, 1.0).normalized().unwrap();
        assert_relative_eq!(v4, Vector4::splat(0.5), epsilon = 1e-15);
    }

    #[test]
    fn test_normalize_degenerate_vector_fails() {
        assert!(matches!(
            Vector3::ZERO.normalized(),
            Err(MathError::DegenerateVector { .. })
        ));
        assert!(Vector2::new(1e-17, 0.0).normalized().is_err());
        assert!(Vector3::new(f64::NAN, 0.0, 1.0).normalized().is_err());

        // A custom threshold overrides the default
        assert!(Vector3::new(1e-3, 0.0, 0.0).normalized().is_ok());
        assert!(Vector3::new(1e-3, 0.0, 0.0).normalized_with(1e-2).is_err());
    }

    #[test]
    fn test_index_and_arrays() {
        let v = Vector4::from([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(v[0], 1.0);
        assert_eq!(v[3], 4.0);
        assert_eq!(<[f64; 4]>::from(v), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(v.truncate(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_glam_conversion() {
        let v = Vector3::new(1.5, -2.0, 3.25);
        let g: glam::DVec3 = v.into();
        assert_eq!(g, glam::DVec3::new(1.5, -2.0, 3.25));
        assert_eq!(Vector3::from(g), v);
    }

    #[test]
    fn test_ron_deserialize() {
        let v: Vector3 = ron::from_str("(x: 1.0, y: 2.0, z: -0.5)").unwrap();
        assert_eq!(v, Vector3::new(1.0, 2.0, -0.5));
    }
}
