//! Cross-taxonomy mapping between source taxonomies and a union taxonomy.
//!
//! An [Alignment] records which union taxon each source taxon was matched to
//! ("mapped") and, conversely, which source taxa were matched to each union
//! taxon ("comapped"). The mapping lives here rather than on the taxa, so
//! taxonomies stay independent and clearing an alignment is a single call.
//!
//! Handles carry the tag of their taxonomy, so one alignment can hold the
//! mappings of several source taxonomies at once.

use crate::error::TaxonomyError;
use crate::model::taxon::{TaxonIndex, TaxonomyTag};
use crate::model::taxonomy::Taxonomy;
use std::collections::HashMap;

/// Mappings from source taxa into one union taxonomy.
#[derive(Debug, Clone)]
pub struct Alignment {
    union: TaxonomyTag,
    mapped: HashMap<TaxonIndex, TaxonIndex>,
    comapped: HashMap<TaxonIndex, Vec<TaxonIndex>>,
}

impl Alignment {
    /// Creates an empty alignment into `union`.
    pub fn new(union: &Taxonomy) -> Self {
        Alignment {
            union: union.tag(),
            mapped: HashMap::new(),
            comapped: HashMap::new(),
        }
    }

    /// Returns the tag of the union taxonomy.
    pub fn union_tag(&self) -> TaxonomyTag {
        self.union
    }

    /// Returns the number of mapped source taxa.
    pub fn len(&self) -> usize {
        self.mapped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapped.is_empty()
    }

    /// Maps `node` of `source` to `target` of `union`, replacing any earlier
    /// mapping of `node`.
    ///
    /// # Errors
    /// * [TaxonomyError::ForeignTaxonomy] - `node` is not in `source`, `target`
    ///   is not in `union`, `union` is not this alignment's union, or `source`
    ///   is the union itself
    /// * [TaxonomyError::PrunedTaxon] - either taxon is pruned
    pub fn map(
        &mut self,
        source: &Taxonomy,
        node: TaxonIndex,
        union: &Taxonomy,
        target: TaxonIndex,
    ) -> Result<(), TaxonomyError> {
        if source.tag() == self.union || !source.contains(node) {
            return Err(TaxonomyError::ForeignTaxonomy(node));
        }
        if union.tag() != self.union {
            return Err(TaxonomyError::ForeignTaxonomy(target));
        }
        source.check_live(node)?;
        union.check_live(target)?;

        self.unmap(node);
        self.mapped.insert(node, target);
        self.comapped.entry(target).or_default().push(node);
        Ok(())
    }

    /// Removes the mapping of `node`, returning its former image.
    pub fn unmap(&mut self, node: TaxonIndex) -> Option<TaxonIndex> {
        let target = self.mapped.remove(&node)?;
        if let Some(sources) = self.comapped.get_mut(&target) {
            sources.retain(|s| *s != node);
            if sources.is_empty() {
                self.comapped.remove(&target);
            }
        }
        Some(target)
    }

    /// Returns the union taxon `node` is mapped to.
    pub fn mapped(&self, node: TaxonIndex) -> Option<TaxonIndex> {
        self.mapped.get(&node).copied()
    }

    /// Returns the source taxa mapped to the union taxon `target`.
    pub fn comapped(&self, target: TaxonIndex) -> &[TaxonIndex] {
        self.comapped.get(&target).map_or(&[], Vec::as_slice)
    }

    /// Returns the nearest ancestor-or-self of `node` that is mapped, together
    /// with its union image.
    pub fn nearest_mapped_ancestor(&self, source: &Taxonomy, node: TaxonIndex) -> Option<(TaxonIndex, TaxonIndex)> {
        if !source.contains(node) {
            return None;
        }
        std::iter::once(node)
            .chain(source.ancestors(node))
            .find_map(|a| self.mapped(a).map(|image| (a, image)))
    }

    /// Returns the union taxon standing for `node`: the node itself if it
    /// belongs to the union, else the image of its nearest mapped ancestor.
    pub fn project(&self, taxonomy: &Taxonomy, node: TaxonIndex) -> Option<TaxonIndex> {
        if taxonomy.tag() == self.union {
            taxonomy.contains(node).then_some(node)
        } else {
            self.nearest_mapped_ancestor(taxonomy, node).map(|(_, image)| image)
        }
    }

    /// Divergence of two taxa from any taxonomies of this alignment, computed
    /// in the union after projecting both (see [Alignment::project]).
    ///
    /// # Returns
    /// `None` if either taxon has no mapped ancestor, or as for
    /// [Taxonomy::divergence].
    pub fn divergence(
        &self,
        union: &Taxonomy,
        a: (&Taxonomy, TaxonIndex),
        b: (&Taxonomy, TaxonIndex),
    ) -> Result<Option<(TaxonIndex, TaxonIndex)>, TaxonomyError> {
        if union.tag() != self.union {
            return Err(TaxonomyError::ForeignTaxonomy(union.forest()));
        }
        match (self.project(a.0, a.1), self.project(b.0, b.1)) {
            (Some(a), Some(b)) => union.divergence(a, b),
            _ => Ok(None),
        }
    }

    /// Division of a source taxon: the division of its projection into the union.
    pub fn division_of(&self, source: &Taxonomy, node: TaxonIndex, union: &Taxonomy) -> Option<TaxonIndex> {
        if union.tag() != self.union {
            return None;
        }
        self.project(source, node).and_then(|image| union.division(image))
    }

    /// Forgets the mappings of one source taxonomy.
    pub fn reset_source(&mut self, source: TaxonomyTag) {
        let nodes: Vec<TaxonIndex> = self.mapped.keys().copied().filter(|n| n.taxonomy() == source).collect();
        for node in nodes {
            self.unmap(node);
        }
    }

    /// Forgets all mappings.
    pub fn reset(&mut self) {
        self.mapped.clear();
        self.comapped.clear();
    }
}
