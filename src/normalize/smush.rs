//! Folding of sibling homonyms.

use crate::error::TaxonomyError;
use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;
use indexmap::IndexMap;

impl Taxonomy {
    /// Merges siblings that share a name into the preferred one
    /// (first in [Taxonomy::compare_taxa] order).
    ///
    /// Runs top-down, so children gathered under a surviving taxon are
    /// themselves checked for homonyms afterwards.
    ///
    /// # Returns
    /// The number of taxa absorbed.
    pub fn smush(&mut self) -> Result<usize, TaxonomyError> {
        let forest = self.forest();
        let order: Vec<TaxonIndex> = self.pre_order(forest).collect();
        let mut absorbed = 0;

        for parent in order {
            if self[parent].is_pruned() {
                continue;
            }
            let mut by_name: IndexMap<String, Vec<TaxonIndex>> = IndexMap::new();
            for child in self[parent].children() {
                if let Some(name) = self[*child].name() {
                    by_name.entry(name.to_string()).or_default().push(*child);
                }
            }

            for (_, mut homonyms) in by_name.into_iter().filter(|(_, h)| h.len() > 1) {
                homonyms.sort_by(|a, b| self.compare_taxa(*a, *b));
                let target = homonyms[0];
                for other in &homonyms[1..] {
                    self.absorb(target, *other)?;
                    absorbed += 1;
                }
            }
        }
        Ok(absorbed)
    }
}
