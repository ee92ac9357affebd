//! Entity Component System module
//!
//! Built on top of the hecs ECS library. Transforms are ordinary hecs
//! components; the parent/child structure lives beside them in one
//! [`EntityGraph`] per [`GraphId`].

mod components;
mod hierarchy;
mod registry;
mod transform;
mod world;

pub use components::{Behaviour, Behaviours, Enabled, GraphId, Name, TransformHooks};
pub use hierarchy::{Children, EntityGraph, HierarchyError, OrphanPolicy, ReparentMode};
pub use registry::GraphRegistry;
pub use transform::Transform;
pub use world::World;
