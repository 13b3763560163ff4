//! Identity registry: the name index and the id index of a taxonomy.
//!
//! The registry is owned by a [Taxonomy](crate::model::taxonomy::Taxonomy) and
//! only mutated by it, so both indices change together with the tree.

use crate::model::taxon::{Entity, TaxonIndex};
use indexmap::IndexSet;
use std::collections::HashMap;

/// Name → entities and id → taxon lookup tables.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    by_name: HashMap<String, IndexSet<Entity>>,
    by_id: HashMap<String, TaxonIndex>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry::default()
    }

    /// Returns all entities registered under `name`, without duplicates.
    pub fn lookup_name(&self, name: &str) -> impl Iterator<Item = Entity> + '_ {
        self.by_name.get(name).into_iter().flatten().copied()
    }

    /// Returns the number of entities registered under `name`.
    pub fn name_count(&self, name: &str) -> usize {
        self.by_name.get(name).map_or(0, IndexSet::len)
    }

    /// Returns the taxon bound to `id` (primary id or alias).
    ///
    /// Callers filter pruned taxa; see
    /// [Taxonomy::lookup_id](crate::model::taxonomy::Taxonomy::lookup_id).
    pub fn lookup_id(&self, id: &str) -> Option<TaxonIndex> {
        self.by_id.get(id).copied()
    }

    /// Returns the number of names in the index.
    pub fn num_names(&self) -> usize {
        self.by_name.len()
    }

    /// Iterates over all (id, taxon) bindings.
    pub fn ids(&self) -> impl Iterator<Item = (&str, TaxonIndex)> + '_ {
        self.by_id.iter().map(|(id, taxon)| (id.as_str(), *taxon))
    }

    pub(crate) fn register(&mut self, name: &str, entity: Entity) {
        self.by_name
            .entry(name.to_string())
            .or_default()
            .insert(entity);
    }

    pub(crate) fn unregister(&mut self, name: &str, entity: Entity) -> bool {
        let Some(entities) = self.by_name.get_mut(name) else {
            return false;
        };
        let removed = entities.shift_remove(&entity);
        if entities.is_empty() {
            self.by_name.remove(name);
        }
        removed
    }

    /// Binds `id` to `taxon`, replacing any previous binding; the caller has
    /// already checked for collisions.
    pub(crate) fn bind(&mut self, id: &str, taxon: TaxonIndex) {
        self.by_id.insert(id.to_string(), taxon);
    }

    /// Removes the binding of `id` if it points at `taxon`.
    pub(crate) fn unbind(&mut self, id: &str, taxon: TaxonIndex) -> bool {
        if self.by_id.get(id) == Some(&taxon) {
            self.by_id.remove(id);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::taxon::TaxonomyTag;

    #[test]
    fn names_are_sets() {
        let tag = TaxonomyTag::fresh();
        let a = Entity::Taxon(TaxonIndex::new(tag, 1));
        let b = Entity::Taxon(TaxonIndex::new(tag, 2));
        let mut registry = Registry::new();
        registry.register("Morus", a);
        registry.register("Morus", a);
        registry.register("Morus", b);
        assert_eq!(registry.name_count("Morus"), 2);

        assert!(registry.unregister("Morus", a));
        assert!(!registry.unregister("Morus", a));
        assert!(registry.unregister("Morus", b));
        assert_eq!(registry.num_names(), 0);
    }

    #[test]
    fn unbind_checks_owner() {
        let tag = TaxonomyTag::fresh();
        let a = TaxonIndex::new(tag, 1);
        let b = TaxonIndex::new(tag, 2);
        let mut registry = Registry::new();
        registry.bind("10", a);
        assert!(!registry.unbind("10", b));
        assert_eq!(registry.lookup_id("10"), Some(a));
        assert!(registry.unbind("10", a));
        assert_eq!(registry.lookup_id("10"), None);
    }
}
