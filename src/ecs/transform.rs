//! Transform node with a dirty-flagged world matrix cache
//!
//! A [`Transform`] holds an entity's local translation, rotation and scale,
//! the local matrix composed from them, and the last world matrix computed
//! for it. The dirty flag says whether that world matrix is stale.
//!
//! The setters are crate-private: changing a node's pose also invalidates
//! every descendant, which only the [`super::EntityGraph`] can do. Mutate
//! through [`super::World::set_local`].
//!
//! ```ignore
//! let entity = world.spawn(GraphId(0));
//! world.set_local(entity, Some(Vector3::new(1.0, 0.0, 0.0)), None, None)?;
//!
//! // First read recomputes and caches
//! let matrix = world.world_matrix(entity)?;
//!
//! // Clean reads return the cached value
//! let again = world.world_matrix(entity)?;
//! ```

use crate::math::{Matrix4x4, MathError, Quaternion, Trs, Vector3};

// ============================================================================
// Transform
// ============================================================================

/// Local TRS state plus cached local and world matrices.
///
/// | Operation       | Cost                                  |
/// |-----------------|---------------------------------------|
/// | Read (clean)    | O(1), returns cached                  |
/// | Read (dirty)    | O(dirty ancestors), recomputes chain  |
/// | Write           | O(subtree), marks descendants dirty   |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position relative to the parent
    position: Vector3,
    /// Rotation relative to the parent, unit norm
    rotation: Quaternion,
    /// Per-axis scale
    scale: Vector3,

    /// `T · R · S` of the fields above, recomputed on every write
    local_matrix: Matrix4x4,
    /// Last computed world matrix, valid only while clean
    world_matrix: Matrix4x4,
    /// Whether `world_matrix` is stale
    dirty: bool,
}

impl Transform {
    /// Identity transform, dirty until first read.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a decomposed pose.
    ///
    /// # Errors
    ///
    /// Returns [`MathError::DegenerateVector`] for a zero rotation quaternion.
    pub fn from_trs(trs: Trs) -> Result<Self, MathError> {
        let mut transform = Self::new();
        transform.set_local(Some(trs.translation), Some(trs.rotation), Some(trs.scale))?;
        Ok(transform)
    }

    // -------------------------------------------------------------------------
    // Getters
    // -------------------------------------------------------------------------

    /// Local position.
    #[must_use]
    #[inline]
    pub fn position(&self) -> Vector3 {
        self.position
    }

    /// Local rotation.
    #[must_use]
    #[inline]
    pub fn rotation(&self) -> Quaternion {
        self.rotation
    }

    /// Local scale.
    #[must_use]
    #[inline]
    pub fn scale(&self) -> Vector3 {
        self.scale
    }

    /// Local matrix, `T · R · S`.
    #[must_use]
    #[inline]
    pub fn local_matrix(&self) -> Matrix4x4 {
        self.local_matrix
    }

    /// Local pose as a [`Trs`].
    #[must_use]
    pub fn to_trs(&self) -> Trs {
        Trs::new(self.position, self.rotation, self.scale)
    }

    /// The cached world matrix, or `None` while it is stale.
    #[must_use]
    pub fn cached_world_matrix(&self) -> Option<Matrix4x4> {
        (!self.dirty).then_some(self.world_matrix)
    }

    /// Check if the cached world matrix needs recomputation.
    #[must_use]
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Local forward direction (negative Z).
    #[must_use]
    pub fn forward(&self) -> Vector3 {
        self.rotation * -Vector3::Z
    }

    /// Local right direction (positive X).
    #[must_use]
    pub fn right(&self) -> Vector3 {
        self.rotation * Vector3::X
    }

    /// Local up direction (positive Y).
    #[must_use]
    pub fn up(&self) -> Vector3 {
        self.rotation * Vector3::Y
    }

    // -------------------------------------------------------------------------
    // Crate-private mutation
    // -------------------------------------------------------------------------

    /// Update any subset of the local pose.
    ///
    /// Returns whether anything changed; writing the current values leaves
    /// the cache alone. A given rotation is normalized first.
    pub(crate) fn set_local(
        &mut self,
        position: Option<Vector3>,
        rotation: Option<Quaternion>,
        scale: Option<Vector3>,
    ) -> Result<bool, MathError> {
        let rotation = rotation.map(Quaternion::normalized).transpose()?;

        let mut changed = false;
        if let Some(position) = position.filter(|p| *p != self.position) {
            self.position = position;
            changed = true;
        }
        if let Some(rotation) = rotation.filter(|r| *r != self.rotation) {
            self.rotation = rotation;
            changed = true;
        }
        if let Some(scale) = scale.filter(|s| *s != self.scale) {
            self.scale = scale;
            changed = true;
        }

        if changed {
            self.local_matrix = Matrix4x4::trs(self.position, self.rotation, self.scale);
            self.dirty = true;
        }
        Ok(changed)
    }

    /// Mark stale; returns whether the node was clean before.
    pub(crate) fn mark_dirty(&mut self) -> bool {
        !std::mem::replace(&mut self.dirty, true)
    }

    /// Cache a freshly computed world matrix and clear the dirty flag.
    pub(crate) fn store_world(&mut self, world_matrix: Matrix4x4) {
        self.world_matrix = world_matrix;
        self.dirty = false;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::ZERO,
            rotation: Quaternion::IDENTITY,
            scale: Vector3::ONE,
            local_matrix: Matrix4x4::IDENTITY,
            world_matrix: Matrix4x4::IDENTITY,
            dirty: true,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_default() {
        let t = Transform::new();

        assert_eq!(t.position(), Vector3::ZERO);
        assert_eq!(t.rotation(), Quaternion::IDENTITY);
        assert_eq!(t.scale(), Vector3::ONE);
        assert_eq!(t.local_matrix(), Matrix4x4::IDENTITY);
        assert!(t.is_dirty());
        assert!(t.cached_world_matrix().is_none());
    }

    #[test]
    fn test_set_local_recomputes_local_matrix() {
        let mut t = Transform::new();
        let rotation = Quaternion::from_rotation_z(0.5);
        let changed = t
            .set_local(Some(Vector3::new(1.0, 2.0, 3.0)), Some(rotation), None)
            .unwrap();

        assert!(changed);
        assert_eq!(t.scale(), Vector3::ONE);
        assert_relative_eq!(
            t.local_matrix(),
            Matrix4x4::trs(Vector3::new(1.0, 2.0, 3.0), rotation, Vector3::ONE),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_store_world_cleans() {
        let mut t = Transform::new();
        let world = Matrix4x4::from_translation(Vector3::new(5.0, 0.0, 0.0));
        t.store_world(world);

        assert!(!t.is_dirty());
        assert_eq!(t.cached_world_matrix(), Some(world));

        assert!(t.mark_dirty());
        assert!(!t.mark_dirty());
        assert!(t.cached_world_matrix().is_none());
    }

    #[test]
    fn test_same_value_no_invalidate() {
        let mut t = Transform::new();
        t.set_local(Some(Vector3::new(1.0, 2.0, 3.0)), None, None).unwrap();
        t.store_world(t.local_matrix());

        let changed = t
            .set_local(Some(Vector3::new(1.0, 2.0, 3.0)), None, Some(Vector3::ONE))
            .unwrap();
        assert!(!changed);
        assert!(!t.is_dirty());
    }

    #[test]
    fn test_rotation_is_normalized() {
        let mut t = Transform::new();
        t.set_local(None, Some(Quaternion::from_xyzw(0.0, 0.0, 2.0, 2.0)), None)
            .unwrap();
        assert_relative_eq!(t.rotation().norm(), 1.0, epsilon = 1e-15);

        let zero = Quaternion::from_xyzw(0.0, 0.0, 0.0, 0.0);
        assert!(t.set_local(None, Some(zero), None).is_err());
    }

    #[test]
    fn test_directions() {
        let t = Transform::new();
        assert_relative_eq!(t.forward(), -Vector3::Z);
        assert_relative_eq!(t.right(), Vector3::X);
        assert_relative_eq!(t.up(), Vector3::Y);

        let turned = Transform::from_trs(Trs::new(
            Vector3::ZERO,
            Quaternion::from_rotation_y(std::f64::consts::FRAC_PI_2),
            Vector3::ONE,
        ))
        .unwrap();
        assert_relative_eq!(turned.forward(), -Vector3::X, epsilon = 1e-12);
    }
}
