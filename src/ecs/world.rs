//! World wrapper around hecs
//!
//! The [`World`] is the public façade of the hierarchy. It owns the `hecs`
//! component storage, the [`GraphRegistry`] and the [`Config`]; every
//! spawned entity gets a [`GraphId`], a [`Transform`] and a [`Behaviours`]
//! list whose first entry is the transform's hooks.

use hecs::Entity;

use super::components::{Behaviour, Behaviours, Enabled, GraphId, Name};
use super::hierarchy::{EntityGraph, HierarchyError, ReparentMode, component_error};
use super::registry::GraphRegistry;
use super::transform::Transform;
use crate::core::Config;
use crate::math::{Matrix4x4, Quaternion, Trs, Vector3};

/// Entities, their transform hierarchies and lifecycle dispatch
pub struct World {
    inner: hecs::World,
    graphs: GraphRegistry,
    config: Config,
}

impl World {
    /// Create a new empty world with the default config
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new empty world
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: hecs::World::new(),
            graphs: GraphRegistry::new(),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Graph registry
    pub fn graphs(&self) -> &GraphRegistry {
        &self.graphs
    }

    /// Graph for `id`, if any entity was ever spawned into it
    pub fn graph(&self, id: GraphId) -> Option<&EntityGraph> {
        self.graphs.get(id)
    }

    // -------------------------------------------------------------------------
    // Entities
    // -------------------------------------------------------------------------

    /// Spawn a root entity with an identity transform into a graph
    pub fn spawn(&mut self, graph_id: GraphId) -> Entity {
        let entity = self.inner.spawn((
            graph_id,
            Transform::new(),
            Behaviours::with_transform(),
            Enabled(false),
        ));
        self.register(entity, graph_id)
    }

    /// Spawn with a debug name
    pub fn spawn_named(&mut self, graph_id: GraphId, name: impl Into<String>) -> Entity {
        let entity = self.inner.spawn((
            graph_id,
            Transform::new(),
            Behaviours::with_transform(),
            Enabled(false),
            Name::new(name),
        ));
        self.register(entity, graph_id)
    }

    fn register(&mut self, entity: Entity, graph_id: GraphId) -> Entity {
        self.graphs.get_or_create(graph_id).insert(entity);
        log::debug!("Spawned {:?} into {}", entity, graph_id);
        entity
    }

    /// Debug name of an entity, if it has one
    pub fn name(&self, entity: Entity) -> Option<String> {
        self.inner
            .get::<&Name>(entity)
            .ok()
            .map(|name| name.0.clone())
    }

    /// Graph the entity belongs to
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::NoSuchEntity`] for a dead entity
    pub fn graph_id(&self, entity: Entity) -> Result<GraphId, HierarchyError> {
        self.inner
            .get::<&GraphId>(entity)
            .map(|id| *id)
            .map_err(|_| HierarchyError::NoSuchEntity(entity))
    }

    /// Despawn an entity, rehoming its children per the configured
    /// [`crate::ecs::OrphanPolicy`]
    ///
    /// Enabled behaviours receive `on_disable` first.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::NoSuchEntity`] for a dead entity
    pub fn despawn(&mut self, entity: Entity) -> Result<(), HierarchyError> {
        let graph_id = self.graph_id(entity)?;
        if let Some(graph) = self.graphs.get_mut(graph_id) {
            graph.remove(&self.inner, entity, self.config.orphan_policy)?;
        }
        self.retire(entity)?;
        log::debug!("Despawned {:?} from {}", entity, graph_id);
        Ok(())
    }

    /// Despawn every entity of a graph and drop the graph
    ///
    /// Returns the number of entities despawned.
    pub fn unload_graph(&mut self, graph_id: GraphId) -> usize {
        let Some(graph) = self.graphs.remove(graph_id) else {
            return 0;
        };

        let mut despawned = 0;
        for entity in graph.iter() {
            if self.retire(entity).is_ok() {
                despawned += 1;
            }
        }
        log::debug!("Unloaded {} with {} entities", graph_id, despawned);
        despawned
    }

    /// Disable if enabled, then remove from storage
    fn retire(&mut self, entity: Entity) -> Result<(), HierarchyError> {
        self.set_enabled(entity, false)?;
        self.inner
            .despawn(entity)
            .map_err(|_| HierarchyError::NoSuchEntity(entity))
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Get the number of entities
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Register a behaviour, keeping the list sorted by priority
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::NoSuchEntity`] for a dead entity
    pub fn add_behaviour(
        &mut self,
        entity: Entity,
        behaviour: Box<dyn Behaviour>,
    ) -> Result<(), HierarchyError> {
        let mut behaviours = self.behaviours_mut(entity)?;
        log::debug!(
            "Adding behaviour {} (priority {}) to {:?}",
            behaviour.name(),
            behaviour.priority(),
            entity
        );
        behaviours.insert(behaviour);
        Ok(())
    }

    /// Behaviour names of an entity in dispatch order
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::NoSuchEntity`] for a dead entity
    pub fn behaviour_names(&self, entity: Entity) -> Result<Vec<&'static str>, HierarchyError> {
        self.inner
            .get::<&Behaviours>(entity)
            .map(|behaviours| behaviours.names())
            .map_err(|_| HierarchyError::NoSuchEntity(entity))
    }

    /// Dispatch `on_start` to every behaviour, then enable the entity
    ///
    /// Only the first call has an effect; later calls return `Ok(())`
    /// without dispatching anything.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::NoSuchEntity`] for a dead entity
    pub fn start(&mut self, entity: Entity) -> Result<(), HierarchyError> {
        if !self.behaviours_mut(entity)?.start(entity) {
            return Ok(());
        }
        self.set_enabled(entity, true)
    }

    /// Enable or disable an entity, dispatching `on_enable` / `on_disable`
    /// when the state changes
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::NoSuchEntity`] for a dead entity
    pub fn set_enabled(&mut self, entity: Entity, enabled: bool) -> Result<(), HierarchyError> {
        let (state, behaviours) = self
            .inner
            .query_one_mut::<(&mut Enabled, &mut Behaviours)>(entity)
            .map_err(|_| HierarchyError::NoSuchEntity(entity))?;
        if state.0 == enabled {
            return Ok(());
        }
        state.0 = enabled;
        if enabled {
            behaviours.enable(entity);
        } else {
            behaviours.disable(entity);
        }
        Ok(())
    }

    /// Check if an entity is enabled
    pub fn is_enabled(&self, entity: Entity) -> bool {
        self.inner
            .get::<&Enabled>(entity)
            .is_ok_and(|enabled| enabled.0)
    }

    fn behaviours_mut(&self, entity: Entity) -> Result<hecs::RefMut<'_, Behaviours>, HierarchyError> {
        self.inner
            .get::<&mut Behaviours>(entity)
            .map_err(|_| HierarchyError::NoSuchEntity(entity))
    }

    // -------------------------------------------------------------------------
    // Transforms
    // -------------------------------------------------------------------------

    /// Copy of an entity's transform
    ///
    /// # Errors
    ///
    /// Returns an error for a dead entity or one without a transform
    pub fn transform(&self, entity: Entity) -> Result<Transform, HierarchyError> {
        self.inner
            .get::<&Transform>(entity)
            .map(|transform| *transform)
            .map_err(|err| component_error(entity, err))
    }

    /// Update any subset of an entity's local pose and invalidate its
    /// subtree
    ///
    /// # Errors
    ///
    /// Returns an error for a dead entity or a zero rotation quaternion
    pub fn set_local(
        &mut self,
        entity: Entity,
        position: Option<Vector3>,
        rotation: Option<Quaternion>,
        scale: Option<Vector3>,
    ) -> Result<(), HierarchyError> {
        let graph = self.member_graph(entity)?;
        let changed = self
            .inner
            .get::<&mut Transform>(entity)
            .map_err(|err| component_error(entity, err))?
            .set_local(position, rotation, scale)?;
        if changed {
            graph.mark_dirty(&self.inner, entity)?;
        }
        Ok(())
    }

    /// Set the local position
    ///
    /// # Errors
    ///
    /// See [`World::set_local`]
    pub fn set_position(&mut self, entity: Entity, position: Vector3) -> Result<(), HierarchyError> {
        self.set_local(entity, Some(position), None, None)
    }

    /// Set the local rotation
    ///
    /// # Errors
    ///
    /// See [`World::set_local`]
    pub fn set_rotation(&mut self, entity: Entity, rotation: Quaternion) -> Result<(), HierarchyError> {
        self.set_local(entity, None, Some(rotation), None)
    }

    /// Set the local scale
    ///
    /// # Errors
    ///
    /// See [`World::set_local`]
    pub fn set_scale(&mut self, entity: Entity, scale: Vector3) -> Result<(), HierarchyError> {
        self.set_local(entity, None, None, Some(scale))
    }

    /// World matrix, recomputed lazily from the highest dirty ancestor
    ///
    /// # Errors
    ///
    /// Returns an error for a dead entity or one without a transform
    pub fn world_matrix(&mut self, entity: Entity) -> Result<Matrix4x4, HierarchyError> {
        self.member_graph(entity)?.world_matrix(&self.inner, entity)
    }

    /// World-space position
    ///
    /// # Errors
    ///
    /// See [`World::world_matrix`]
    pub fn world_position(&mut self, entity: Entity) -> Result<Vector3, HierarchyError> {
        Ok(self.world_matrix(entity)?.translation())
    }

    /// World pose decomposed with the configured tolerance
    ///
    /// # Errors
    ///
    /// See [`World::world_matrix`]
    pub fn world_trs(&mut self, entity: Entity) -> Result<Trs, HierarchyError> {
        let tolerance = self.config.tolerance;
        Ok(self.world_matrix(entity)?.decompose_with(&tolerance))
    }

    // -------------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------------

    /// Parent of an entity
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::NoSuchEntity`] for a dead entity
    pub fn parent(&self, entity: Entity) -> Result<Option<Entity>, HierarchyError> {
        Ok(self.member_graph(entity)?.try_get_parent(entity))
    }

    /// Direct children of an entity
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::NoSuchEntity`] for a dead entity
    pub fn children(&self, entity: Entity) -> Result<&[Entity], HierarchyError> {
        Ok(self.member_graph(entity)?.children(entity))
    }

    /// Set or clear an entity's parent using the configured
    /// [`ReparentMode`]
    ///
    /// # Errors
    ///
    /// See [`World::set_parent_with`]
    pub fn set_parent(&mut self, entity: Entity, parent: Option<Entity>) -> Result<(), HierarchyError> {
        self.set_parent_with(entity, parent, self.config.reparent_mode)
    }

    /// Set or clear an entity's parent
    ///
    /// With [`ReparentMode::KeepWorld`] the local pose is recomputed as
    /// `inverse(parent_world) · old_world`. A result with shear cannot be
    /// held by a TRS and is approximated, with a warning.
    ///
    /// # Errors
    ///
    /// - [`HierarchyError::CrossGraphParent`] or [`HierarchyError::CyclicParent`]
    ///   for an invalid edge
    /// - [`HierarchyError::SingularParent`] under `KeepWorld` when the
    ///   parent's world matrix has no inverse
    ///
    /// Nothing is modified on error.
    pub fn set_parent_with(
        &mut self,
        entity: Entity,
        parent: Option<Entity>,
        mode: ReparentMode,
    ) -> Result<(), HierarchyError> {
        let graph_id = self.graph_id(entity)?;
        let graph = self
            .graphs
            .get_mut(graph_id)
            .ok_or(HierarchyError::NotInGraph { entity, graph: graph_id })?;
        graph.validate_parent(&self.inner, entity, parent)?;
        if graph.try_get_parent(entity) == parent {
            return Ok(());
        }

        let local = match mode {
            ReparentMode::KeepLocal => None,
            ReparentMode::KeepWorld => {
                let old_world = graph.world_matrix(&self.inner, entity)?;
                let parent_world = match parent {
                    Some(p) => graph.world_matrix(&self.inner, p)?,
                    None => Matrix4x4::IDENTITY,
                };
                let inverse = parent_world
                    .inverse()
                    .ok_or(HierarchyError::SingularParent(parent.unwrap_or(entity)))?;

                let local = inverse * old_world;
                if !local.is_valid_trs_with(&self.config.tolerance) {
                    log::warn!(
                        "Reparenting {:?} under {:?} introduces shear; world pose is approximated",
                        entity,
                        parent
                    );
                }
                Some(local.decompose_with(&self.config.tolerance))
            }
        };

        graph.set_parent(&self.inner, entity, parent)?;

        if let Some(trs) = local {
            let changed = self
                .inner
                .get::<&mut Transform>(entity)
                .map_err(|err| component_error(entity, err))?
                .set_local(Some(trs.translation), Some(trs.rotation), Some(trs.scale))?;
            if changed {
                graph.mark_dirty(&self.inner, entity)?;
            }
        }
        Ok(())
    }

    fn member_graph(&self, entity: Entity) -> Result<&EntityGraph, HierarchyError> {
        let graph_id = self.graph_id(entity)?;
        self.graphs
            .get(graph_id)
            .filter(|graph| graph.contains(entity))
            .ok_or(HierarchyError::NotInGraph { entity, graph: graph_id })
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
