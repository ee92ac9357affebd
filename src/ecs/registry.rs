//! Registry of entity graphs keyed by graph id

use rustc_hash::FxHashMap;

use super::{EntityGraph, GraphId};

/// All entity graphs of a world.
///
/// Owned by the [`super::World`]; there is no process-wide instance.
#[derive(Debug, Default)]
pub struct GraphRegistry {
    graphs: FxHashMap<GraphId, EntityGraph>,
}

impl GraphRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph for `id`, created empty on first use.
    pub fn get_or_create(&mut self, id: GraphId) -> &mut EntityGraph {
        self.graphs.entry(id).or_insert_with(|| {
            log::debug!("Created {}", id);
            EntityGraph::new(id)
        })
    }

    /// Graph for `id`, if it exists.
    #[must_use]
    pub fn get(&self, id: GraphId) -> Option<&EntityGraph> {
        self.graphs.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: GraphId) -> Option<&mut EntityGraph> {
        self.graphs.get_mut(&id)
    }

    /// Tear down a graph, returning it.
    pub fn remove(&mut self, id: GraphId) -> Option<EntityGraph> {
        let removed = self.graphs.remove(&id);
        if removed.is_some() {
            log::debug!("Removed {}", id);
        }
        removed
    }

    /// Number of graphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    /// Check if there are no graphs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Ids of all graphs, unordered.
    pub fn ids(&self) -> impl Iterator<Item = GraphId> + '_ {
        self.graphs.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut registry = GraphRegistry::new();
        let mut world = hecs::World::new();
        let entity = world.spawn(());

        registry.get_or_create(GraphId(3)).insert(entity);
        assert_eq!(registry.get_or_create(GraphId(3)).len(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(GraphId(4)).is_none());
    }

    #[test]
    fn test_remove() {
        let mut registry = GraphRegistry::new();
        registry.get_or_create(GraphId(1));
        registry.get_or_create(GraphId(2));

        let removed = registry.remove(GraphId(1)).unwrap();
        assert_eq!(removed.id(), GraphId(1));
        assert!(registry.remove(GraphId(1)).is_none());

        let ids: Vec<_> = registry.ids().collect();
        assert_eq!(ids, vec![GraphId(2)]);
    }
}
