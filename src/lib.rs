//! Spatial transform hierarchy for a real-time 3D runtime
//!
//! This crate provides:
//! - A double-precision linear-algebra kernel (vectors, quaternions,
//!   matrices, TRS compose/decompose)
//! - Per-entity transforms with lazily recomputed, cached world matrices
//! - Parent/child entity graphs built on the hecs ECS
//! - Configuration loaded from RON or JSON

pub mod core;
pub mod ecs;
pub mod math;

// Re-exports for convenience
pub use glam;
pub use hecs;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{Config, ConfigError};
    pub use crate::ecs::{
        Behaviour, EntityGraph, GraphId, HierarchyError, Name, OrphanPolicy, ReparentMode,
        Transform, World,
    };
    pub use crate::math::{
        MathError, Matrix3x3, Matrix3x4, Matrix4x4, Quaternion, Tolerance, Trs, Vector2, Vector3,
        Vector4,
    };
    pub use hecs::Entity;
}
