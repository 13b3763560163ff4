//! Root ordering and forest collapse.

use crate::error::TaxonomyError;
use crate::event_log::Verdict;
use crate::model::flags::Flags;
use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;

impl Taxonomy {
    /// Sorts the roots: the root named like the configured top name first,
    /// then by descending subtree size.
    ///
    /// Warns (and records a `forest` event) if the largest root is not at
    /// least `root_dominance` times larger than the second largest, which
    /// usually means parts of the taxonomy failed to attach.
    ///
    /// # Returns
    /// The roots in their new order.
    pub fn normalize_roots(&mut self) -> Vec<TaxonIndex> {
        let top_name = self.config.top_name.clone();
        let mut roots = self.roots();
        roots.sort_by(|a, b| {
            let a_top = self[*a].name() == Some(top_name.as_str());
            let b_top = self[*b].name() == Some(top_name.as_str());
            b_top
                .cmp(&a_top)
                .then_with(|| self.count(*b).cmp(&self.count(*a)))
                .then_with(|| self.compare_taxa(*a, *b))
        });

        let mut sizes: Vec<usize> = roots.iter().map(|r| self.count(*r)).collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        if let [largest, second, ..] = sizes[..] {
            if largest < second.saturating_mul(self.config.root_dominance) {
                tracing::warn!(roots = roots.len(), largest, second, "taxonomy has competing roots");
                let detail = format!("{} roots, largest {largest}, second {second}", roots.len());
                self.record(roots[0], "forest", largest, Verdict::Warning, detail);
            }
        }

        let forest = self.forest();
        self.node_mut(forest).children = roots.clone();
        roots
    }

    /// Moves every root except the first (see [Taxonomy::normalize_roots])
    /// under the first one, flagged unplaced. Idempotent.
    ///
    /// # Returns
    /// The number of roots moved.
    pub fn deforestate(&mut self) -> Result<usize, TaxonomyError> {
        let roots = self.normalize_roots();
        let Some((&main, others)) = roots.split_first() else {
            return Ok(0);
        };
        for &other in others {
            self.reparent(other, main)?;
            self.node_mut(other).proper |= Flags::UNPLACED;
        }
        if !others.is_empty() {
            tracing::debug!(moved = others.len(), "deforested");
        }
        Ok(others.len())
    }
}
