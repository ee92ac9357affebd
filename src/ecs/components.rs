//! Common ECS components and the lifecycle capability

use hecs::Entity;
use serde::{Deserialize, Serialize};

/// Identifier of the transform hierarchy an entity belongs to.
///
/// Graph ids partition entities; parent/child edges never cross them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId(pub u32);

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "graph#{}", self.0)
    }
}

/// Name component for debugging
#[derive(Debug, Clone)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Whether the entity's behaviours are currently enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enabled(pub bool);

// ============================================================================
// Lifecycle
// ============================================================================

/// A component with lifecycle callbacks and an initialization priority.
///
/// The host sorts an entity's behaviours once, when they are registered;
/// lower priorities run first.
pub trait Behaviour: Send + Sync + 'static {
    /// Short name, used in logs and ordering queries.
    fn name(&self) -> &'static str;

    /// Initialization priority; lower runs first.
    fn priority(&self) -> i32 {
        0
    }

    /// Called once when the host starts the entity.
    fn on_start(&mut self, _entity: Entity) {}

    /// Called when the entity becomes enabled.
    fn on_enable(&mut self, _entity: Entity) {}

    /// Called when the entity becomes disabled or is despawned while enabled.
    fn on_disable(&mut self, _entity: Entity) {}
}

/// Lifecycle hooks of the Transform.
///
/// The transform data itself is the separate [`super::Transform`]
/// component; this entry only pins its place at the front of the lifecycle
/// order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformHooks;

impl TransformHooks {
    /// Most negative priority, so the transform initializes first.
    pub const PRIORITY: i32 = i32::MIN;
}

impl Behaviour for TransformHooks {
    fn name(&self) -> &'static str {
        "Transform"
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }
}

/// An entity's behaviours, kept sorted by priority.
#[derive(Default)]
pub struct Behaviours {
    entries: Vec<Box<dyn Behaviour>>,
    started: bool,
}

impl Behaviours {
    /// Create with the transform's hooks as the first entry.
    #[must_use]
    pub fn with_transform() -> Self {
        Self {
            entries: vec![Box::new(TransformHooks)],
            started: false,
        }
    }

    /// Insert a behaviour after every entry with a priority less than or
    /// equal to its own, so equal priorities keep registration order.
    pub fn insert(&mut self, behaviour: Box<dyn Behaviour>) {
        let priority = behaviour.priority();
        let index = self.entries.partition_point(|b| b.priority() <= priority);
        self.entries.insert(index, behaviour);
    }

    /// Names in dispatch order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|b| b.name()).collect()
    }

    /// Number of behaviours.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no behaviours.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if `on_start` has been dispatched.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Dispatch `on_start` once; returns false if already started.
    pub(crate) fn start(&mut self, entity: Entity) -> bool {
        if std::mem::replace(&mut self.started, true) {
            return false;
        }
        for behaviour in &mut self.entries {
            behaviour.on_start(entity);
        }
        true
    }

    pub(crate) fn enable(&mut self, entity: Entity) {
        for behaviour in &mut self.entries {
            behaviour.on_enable(entity);
        }
    }

    pub(crate) fn disable(&mut self, entity: Entity) {
        for behaviour in &mut self.entries {
            behaviour.on_disable(entity);
        }
    }
}

impl std::fmt::Debug for Behaviours {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
