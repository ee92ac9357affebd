//! Entity hierarchy
//!
//! Parent-child relationships between entities of one graph, used for
//! transform propagation. The graph stores only entity ids; the
//! [`Transform`] components live in the `hecs` world and are passed in.
//!
//! Invalidation is push-based and recomputation is pull-based:
//! [`EntityGraph::mark_dirty`] eagerly flags a node and its whole subtree,
//! [`EntityGraph::world_matrix`] recomputes lazily from the highest dirty
//! ancestor down to the requested node. A dirty node always has a dirty
//! subtree, so a clean node always has clean ancestors.

use hecs::Entity;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{GraphId, Transform};
use crate::math::{MathError, Matrix4x4};

/// Errors from hierarchy operations
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum HierarchyError {
    /// Parent and child belong to different graphs
    #[error("cannot parent {entity:?} to {parent:?}: they belong to different graphs")]
    CrossGraphParent {
        /// Child being reparented
        entity: Entity,
        /// Requested parent
        parent: Entity,
    },
    /// Parent is the entity itself or one of its descendants
    #[error("cannot parent {entity:?} to {parent:?}: it would create a cycle")]
    CyclicParent {
        /// Child being reparented
        entity: Entity,
        /// Requested parent
        parent: Entity,
    },
    /// Entity does not exist
    #[error("entity {0:?} does not exist")]
    NoSuchEntity(Entity),
    /// Entity has no transform
    #[error("entity {0:?} has no transform")]
    MissingTransform(Entity),
    /// Entity is not a member of the graph
    #[error("entity {entity:?} is not in {graph}")]
    NotInGraph {
        /// The entity
        entity: Entity,
        /// The graph it was looked up in
        graph: GraphId,
    },
    /// World-preserving reparent under a parent whose world matrix has no inverse
    #[error("parent {0:?} has a singular world matrix")]
    SingularParent(Entity),
    /// Invalid local pose
    #[error(transparent)]
    Math(#[from] MathError),
}

/// What happens to the children of a removed node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrphanPolicy {
    /// Children attach to the removed node's parent, or become roots
    #[default]
    ReparentToGrandparent,
    /// Children always become roots
    PromoteToRoots,
}

/// Which pose a reparented node keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReparentMode {
    /// Local TRS is unchanged; the world pose follows the new parent
    #[default]
    KeepLocal,
    /// Local TRS is recomputed so the world pose stays put
    KeepWorld,
}

/// Child list, inline up to eight entries
pub type Children = SmallVec<[Entity; 8]>;

#[derive(Debug, Clone, Default)]
struct Node {
    parent: Option<Entity>,
    children: Children,
}

// ============================================================================
// Entity Graph
// ============================================================================

/// Parent/child adjacency for the entities of one [`GraphId`].
#[derive(Debug, Clone)]
pub struct EntityGraph {
    id: GraphId,
    nodes: FxHashMap<Entity, Node>,
    /// Parentless members, in insertion order
    roots: Vec<Entity>,
}

impl EntityGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new(id: GraphId) -> Self {
        Self {
            id,
            nodes: FxHashMap::default(),
            roots: Vec::new(),
        }
    }

    /// This graph's id.
    #[must_use]
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Check if an entity is a member.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.nodes.contains_key(&entity)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parentless members in insertion order.
    #[must_use]
    pub fn roots(&self) -> &[Entity] {
        &self.roots
    }

    /// Parent of a member, `None` for roots and non-members.
    #[must_use]
    pub fn try_get_parent(&self, entity: Entity) -> Option<Entity> {
        self.nodes.get(&entity).and_then(|node| node.parent)
    }

    /// Direct children of a member, empty for leaves and non-members.
    #[must_use]
    pub fn children(&self, entity: Entity) -> &[Entity] {
        self.nodes
            .get(&entity)
            .map_or(&[], |node| node.children.as_slice())
    }

    /// Iterate over all members.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.nodes.keys().copied()
    }

    /// Check if `ancestor` is a strict ancestor of `entity`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut cursor = self.try_get_parent(entity);
        while let Some(node) = cursor {
            if node == ancestor {
                return true;
            }
            cursor = self.try_get_parent(node);
        }
        false
    }

    // -------------------------------------------------------------------------
    // Membership
    // -------------------------------------------------------------------------

    /// Add an entity as a new root.
    pub(crate) fn insert(&mut self, entity: Entity) {
        if self.nodes.insert(entity, Node::default()).is_none() {
            self.roots.push(entity);
        }
    }

    /// Unlink a member and rehome its children according to `policy`.
    ///
    /// Rehomed children keep their local pose and are marked dirty. Every
    /// descendant must have a transform; otherwise nothing is modified.
    pub(crate) fn remove(
        &mut self,
        world: &hecs::World,
        entity: Entity,
        policy: OrphanPolicy,
    ) -> Result<(), HierarchyError> {
        if !self.contains(entity) {
            return Err(HierarchyError::NotInGraph {
                entity,
                graph: self.id,
            });
        }
        let mut stack: SmallVec<[Entity; 16]> = SmallVec::from_slice(self.children(entity));
        while let Some(node) = stack.pop() {
            transform_ref(world, node)?;
            stack.extend_from_slice(self.children(node));
        }

        let node = self.nodes.remove(&entity).unwrap_or_default();
        self.detach(entity, node.parent);

        let new_parent = match policy {
            OrphanPolicy::ReparentToGrandparent => node.parent,
            OrphanPolicy::PromoteToRoots => None,
        };
        for &child in &node.children {
            self.attach(child, new_parent);
            self.mark_dirty(world, child)?;
        }

        log::debug!(
            "Removed {:?} from {}, rehomed {} children under {:?}",
            entity,
            self.id,
            node.children.len(),
            new_parent
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Parenting
    // -------------------------------------------------------------------------

    /// Check that `entity` may be parented to `parent` without changing
    /// anything.
    ///
    /// # Errors
    ///
    /// - [`HierarchyError::NotInGraph`] if `entity` is not a member
    /// - [`HierarchyError::CrossGraphParent`] if `parent` belongs to another graph
    /// - [`HierarchyError::CyclicParent`] if `parent` is `entity` or a descendant
    pub fn validate_parent(
        &self,
        world: &hecs::World,
        entity: Entity,
        parent: Option<Entity>,
    ) -> Result<(), HierarchyError> {
        if !self.contains(entity) {
            return Err(HierarchyError::NotInGraph {
                entity,
                graph: self.id,
            });
        }
        let Some(parent) = parent else {
            return Ok(());
        };

        let parent_graph = *world
            .get::<&GraphId>(parent)
            .map_err(|_| HierarchyError::NoSuchEntity(parent))?;
        if parent_graph != self.id || !self.contains(parent) {
            return Err(HierarchyError::CrossGraphParent { entity, parent });
        }

        // O(depth) upward walk from the new parent
        if parent == entity || self.is_ancestor(entity, parent) {
            return Err(HierarchyError::CyclicParent { entity, parent });
        }
        Ok(())
    }

    /// Set or clear the parent of `entity` and mark its subtree dirty.
    ///
    /// The local pose is kept. On error nothing is modified.
    ///
    /// # Errors
    ///
    /// See [`EntityGraph::validate_parent`].
    pub fn set_parent(
        &mut self,
        world: &hecs::World,
        entity: Entity,
        parent: Option<Entity>,
    ) -> Result<(), HierarchyError> {
        self.validate_parent(world, entity, parent)?;

        let old_parent = self.try_get_parent(entity);
        if old_parent == parent {
            return Ok(());
        }

        self.detach(entity, old_parent);
        self.attach(entity, parent);
        log::debug!("Reparented {:?}: {:?} -> {:?}", entity, old_parent, parent);

        self.mark_dirty(world, entity)
    }

    fn detach(&mut self, entity: Entity, parent: Option<Entity>) {
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent_node) => parent_node.children.retain(|c| *c != entity),
            None => self.roots.retain(|r| *r != entity),
        }
    }

    fn attach(&mut self, entity: Entity, parent: Option<Entity>) {
        if let Some(node) = self.nodes.get_mut(&entity) {
            node.parent = parent;
        }
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent_node) => parent_node.children.push(entity),
            None => self.roots.push(entity),
        }
    }

    // -------------------------------------------------------------------------
    // Dirty propagation
    // -------------------------------------------------------------------------

    /// Mark `entity` and every descendant dirty.
    ///
    /// Descent stops at nodes that are already dirty, since their subtrees
    /// are too. The starting node is always descended, as its own flag may
    /// have just been set by a local write.
    ///
    /// # Errors
    ///
    /// Returns an error if a visited entity lost its transform.
    pub fn mark_dirty(&self, world: &hecs::World, entity: Entity) -> Result<(), HierarchyError> {
        transform_mut(world, entity)?.mark_dirty();

        let mut stack: SmallVec<[Entity; 16]> = SmallVec::from_slice(self.children(entity));
        let mut marked = 1usize;
        while let Some(node) = stack.pop() {
            let was_clean = transform_mut(world, node)?.mark_dirty();
            if was_clean {
                marked += 1;
                stack.extend_from_slice(self.children(node));
            }
        }

        log::trace!("Marked {} nodes dirty under {:?}", marked, entity);
        Ok(())
    }

    /// World matrix of `entity`, recomputing stale levels as needed.
    ///
    /// Walks up to the first clean ancestor (or past the root), then
    /// recomputes `parent_world · local` downward, caching each level.
    ///
    /// # Errors
    ///
    /// [`HierarchyError::NotInGraph`] if `entity` is not a member, or an
    /// error if a node on the path has no transform.
    pub fn world_matrix(
        &self,
        world: &hecs::World,
        entity: Entity,
    ) -> Result<Matrix4x4, HierarchyError> {
        if !self.contains(entity) {
            return Err(HierarchyError::NotInGraph {
                entity,
                graph: self.id,
            });
        }

        let mut chain: SmallVec<[Entity; 16]> = SmallVec::new();
        let mut parent_world = Matrix4x4::IDENTITY;
        let mut cursor = Some(entity);
        while let Some(node) = cursor {
            if let Some(cached) = transform_ref(world, node)?.cached_world_matrix() {
                parent_world = cached;
                break;
            }
            chain.push(node);
            cursor = self.try_get_parent(node);
        }

        if !chain.is_empty() {
            log::trace!("Recomputing {} world matrices for {:?}", chain.len(), entity);
        }
        for &node in chain.iter().rev() {
            let mut transform = transform_mut(world, node)?;
            let world_matrix = parent_world * transform.local_matrix();
            transform.store_world(world_matrix);
            parent_world = world_matrix;
        }
        Ok(parent_world)
    }
}

fn transform_ref(world: &hecs::World, entity: Entity) -> Result<hecs::Ref<'_, Transform>, HierarchyError> {
    world.get::<&Transform>(entity).map_err(|err| component_error(entity, err))
}

fn transform_mut(world: &hecs::World, entity: Entity) -> Result<hecs::RefMut<'_, Transform>, HierarchyError> {
    world.get::<&mut Transform>(entity).map_err(|err| component_error(entity, err))
}

pub(crate) fn component_error(entity: Entity, err: hecs::ComponentError) -> HierarchyError {
    match err {
        hecs::ComponentError::NoSuchEntity => HierarchyError::NoSuchEntity(entity),
        hecs::ComponentError::MissingComponent(_) => HierarchyError::MissingTransform(entity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quaternion, Vector3};
    use approx::assert_relative_eq;

    fn spawn(world: &mut hecs::World, graph: &mut EntityGraph, position: Vector3) -> Entity {
        let mut transform = Transform::new();
        transform.set_local(Some(position), None, None).unwrap();
        let entity = world.spawn((graph.id(), transform));
        graph.insert(entity);
        entity
    }

    fn is_dirty(world: &hecs::World, entity: Entity) -> bool {
        world.get::<&Transform>(entity).unwrap().is_dirty()
    }

    /// root -> a -> b, root -> c
    fn chain() -> (hecs::World, EntityGraph, [Entity; 4]) {
        let mut world = hecs::World::new();
        let mut graph = EntityGraph::new(GraphId(0));
        let root = spawn(&mut world, &mut graph, Vector3::new(1.0, 0.0, 0.0));
        let a = spawn(&mut world, &mut graph, Vector3::new(0.0, 2.0, 0.0));
        let b = spawn(&mut world, &mut graph, Vector3::new(0.0, 0.0, 3.0));
        let c = spawn(&mut world, &mut graph, Vector3::new(-1.0, 0.0, 0.0));
        graph.set_parent(&world, a, Some(root)).unwrap();
        graph.set_parent(&world, b, Some(a)).unwrap();
        graph.set_parent(&world, c, Some(root)).unwrap();
        (world, graph, [root, a, b, c])
    }

    #[test]
    fn test_topology() {
        let (_world, graph, [root, a, b, c]) = chain();

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.roots(), &[root]);
        assert_eq!(graph.children(root), &[a, c]);
        assert_eq!(graph.try_get_parent(b), Some(a));
        assert_eq!(graph.try_get_parent(root), None);
        assert!(graph.is_ancestor(root, b));
        assert!(!graph.is_ancestor(b, root));
        assert!(!graph.is_ancestor(c, b));
    }

    #[test]
    fn test_world_matrix_composes_chain() {
        let (world, graph, [_, _, b, c]) = chain();

        let mb = graph.world_matrix(&world, b).unwrap();
        assert_relative_eq!(mb.translation(), Vector3::new(1.0, 2.0, 3.0));
        let mc = graph.world_matrix(&world, c).unwrap();
        assert_relative_eq!(mc.translation(), Vector3::ZERO);
    }

    #[test]
    fn test_read_cleans_only_the_path() {
        let (world, graph, [root, a, b, c]) = chain();

        graph.world_matrix(&world, a).unwrap();
        assert!(!is_dirty(&world, root));
        assert!(!is_dirty(&world, a));
        assert!(is_dirty(&world, b));
        assert!(is_dirty(&world, c));
    }

    #[test]
    fn test_dirty_propagation() {
        let (world, graph, [root, a, b, c]) = chain();
        let before = graph.world_matrix(&world, b).unwrap();
        graph.world_matrix(&world, c).unwrap();

        // Repeated clean reads return the identical cached value
        assert_eq!(graph.world_matrix(&world, b).unwrap(), before);

        world
            .get::<&mut Transform>(root)
            .unwrap()
            .set_local(Some(Vector3::new(10.0, 0.0, 0.0)), None, None)
            .unwrap();
        graph.mark_dirty(&world, root).unwrap();
        for entity in [root, a, b, c] {
            assert!(is_dirty(&world, entity));
        }

        let after = graph.world_matrix(&world, b).unwrap();
        assert_relative_eq!(after.translation(), Vector3::new(10.0, 2.0, 3.0));
        assert_eq!(graph.world_matrix(&world, b).unwrap(), after);
    }

    #[test]
    fn test_mark_dirty_reaches_clean_grandchildren_below_dirty_start() {
        let (world, graph, [_, a, b, _]) = chain();
        graph.world_matrix(&world, b).unwrap();

        // Local write flags `a` itself before propagation runs
        world
            .get::<&mut Transform>(a)
            .unwrap()
            .set_local(None, Some(Quaternion::from_rotation_x(0.3)), None)
            .unwrap();
        assert!(is_dirty(&world, a));
        assert!(!is_dirty(&world, b));

        graph.mark_dirty(&world, a).unwrap();
        assert!(is_dirty(&world, b));
    }

    #[test]
    fn test_cycle_rejected_topology_unchanged() {
        let (world, mut graph, [root, a, b, c]) = chain();

        let err = graph.set_parent(&world, root, Some(b)).unwrap_err();
        assert_eq!(err, HierarchyError::CyclicParent { entity: root, parent: b });
        let err = graph.set_parent(&world, a, Some(a)).unwrap_err();
        assert_eq!(err, HierarchyError::CyclicParent { entity: a, parent: a });

        assert_eq!(graph.roots(), &[root]);
        assert_eq!(graph.children(root), &[a, c]);
        assert_eq!(graph.children(a), &[b]);
        assert_eq!(graph.try_get_parent(root), None);
    }

    #[test]
    fn test_cross_graph_rejected() {
        let (mut world, mut graph, [root, ..]) = chain();
        let mut other = EntityGraph::new(GraphId(1));
        let stranger = spawn(&mut world, &mut other, Vector3::ZERO);

        let err = graph.set_parent(&world, root, Some(stranger)).unwrap_err();
        assert_eq!(err, HierarchyError::CrossGraphParent { entity: root, parent: stranger });
        let err = other.set_parent(&world, root, None).unwrap_err();
        assert_eq!(err, HierarchyError::NotInGraph { entity: root, graph: GraphId(1) });
        assert_eq!(graph.try_get_parent(root), None);
    }

    #[test]
    fn test_reparent_and_clear() {
        let (world, mut graph, [root, a, b, c]) = chain();

        graph.set_parent(&world, b, Some(c)).unwrap();
        assert_eq!(graph.children(a), &[] as &[Entity]);
        assert_eq!(graph.children(c), &[b]);
        let mb = graph.world_matrix(&world, b).unwrap();
        assert_relative_eq!(mb.translation(), Vector3::new(0.0, 0.0, 3.0));

        graph.set_parent(&world, a, None).unwrap();
        assert_eq!(graph.roots(), &[root, a]);
        assert_eq!(graph.children(root), &[c]);
    }

    #[test]
    fn test_remove_reparents_to_grandparent() {
        let (world, mut graph, [root, a, b, _]) = chain();
        graph.world_matrix(&world, b).unwrap();

        graph.remove(&world, a, OrphanPolicy::ReparentToGrandparent).unwrap();
        assert!(!graph.contains(a));
        assert_eq!(graph.try_get_parent(b), Some(root));
        assert!(is_dirty(&world, b));

        // b keeps its local pose, so it loses a's offset
        let mb = graph.world_matrix(&world, b).unwrap();
        assert_relative_eq!(mb.translation(), Vector3::new(1.0, 0.0, 3.0));
    }

    #[test]
    fn test_remove_promotes_to_roots() {
        let (world, mut graph, [root, a, _, c]) = chain();

        graph.remove(&world, root, OrphanPolicy::PromoteToRoots).unwrap();
        assert_eq!(graph.roots(), &[a, c]);
        assert_eq!(graph.try_get_parent(a), None);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_remove_with_transformless_descendant_changes_nothing() {
        let (mut world, mut graph, [root, a, b, c]) = chain();
        world.remove_one::<Transform>(b).unwrap();

        let err = graph.remove(&world, root, OrphanPolicy::PromoteToRoots).unwrap_err();
        assert_eq!(err, HierarchyError::MissingTransform(b));
        assert!(graph.contains(root));
        assert_eq!(graph.roots(), &[root]);
        assert_eq!(graph.children(root), &[a, c]);
        assert_eq!(graph.try_get_parent(a), Some(root));
        assert_eq!(graph.try_get_parent(c), Some(root));
    }

    #[test]
    fn test_missing_transform() {
        let mut world = hecs::World::new();
        let mut graph = EntityGraph::new(GraphId(0));
        let bare = world.spawn((GraphId(0),));
        graph.insert(bare);

        let err = graph.world_matrix(&world, bare).unwrap_err();
        assert_eq!(err, HierarchyError::MissingTransform(bare));
    }
}
