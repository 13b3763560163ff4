//! Removal of redundant intermediate taxa.

use crate::error::TaxonomyError;
use crate::model::flags::Flags;
use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;

impl Taxonomy {
    /// Elides every non-root taxon that is its parent's only child and either
    /// is (properly) unplaced or has exactly its parent's name.
    ///
    /// Children of an elided unplaced taxon are flagged unplaced in turn.
    ///
    /// # Returns
    /// The number of taxa elided.
    pub fn elide_redundant_intermediate_taxa(&mut self) -> Result<usize, TaxonomyError> {
        let forest = self.forest();
        let order: Vec<TaxonIndex> = self.post_order(forest).collect();
        let mut elided = 0;

        for node in order {
            let taxon = &self[node];
            if taxon.is_pruned() {
                continue;
            }
            let Some(parent) = taxon.parent() else { continue };
            if parent == forest || self[parent].children().len() != 1 {
                continue;
            }
            let unplaced = taxon.proper_flags().contains(Flags::UNPLACED);
            let same_name = taxon.name().is_some() && taxon.name() == self[parent].name();
            if unplaced || same_name {
                tracing::debug!(node = %node, unplaced, same_name, "eliding redundant taxon");
                self.elide(node, !unplaced)?;
                elided += 1;
            }
        }
        Ok(elided)
    }
}
