//! Id assignment: permanent sequential ids and temporary placeholders.

use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;

impl Taxonomy {
    /// Returns the largest id (primary or alias) that is a non-negative
    /// integer, or 0 if there is none.
    pub fn max_numeric_id(&self) -> u64 {
        self.registry
            .ids()
            .filter_map(|(id, _)| id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
    }

    /// Gives every live taxon without id a fresh numeric id, in pre-order.
    ///
    /// Ids start above both the current maximum numeric id and `floor`, so
    /// no id is ever reused.
    ///
    /// # Returns
    /// The number of ids assigned.
    pub fn assign_new_ids(&mut self, floor: u64) -> usize {
        let mut next = self.max_numeric_id().max(floor) + 1;
        let mut assigned = 0;
        for node in self.id_less_taxa() {
            let id = next.to_string();
            next += 1;
            match self.bind_id(node, &id) {
                Ok(()) => assigned += 1,
                Err(err) => tracing::error!(%node, %err, "fresh id rejected"),
            }
        }
        tracing::debug!(assigned, last = next - 1, "assigned new ids");
        assigned
    }

    /// Gives every live taxon without id a unique negative placeholder id
    /// (`-1`, `-2`, ...), skipping placeholders already bound.
    ///
    /// # Returns
    /// The number of ids assigned.
    pub fn assign_dummy_ids(&mut self) -> usize {
        let mut next: i64 = -1;
        let mut assigned = 0;
        for node in self.id_less_taxa() {
            while self.lookup_id(&next.to_string()).is_some() {
                next -= 1;
            }
            if self.bind_id(node, &next.to_string()).is_ok() {
                assigned += 1;
            }
            next -= 1;
        }
        assigned
    }

    /// Removes every placeholder id assigned by [Taxonomy::assign_dummy_ids].
    ///
    /// # Returns
    /// The number of ids removed.
    pub fn purge_temporary_ids(&mut self) -> usize {
        let temporary: Vec<TaxonIndex> = self
            .taxa()
            .filter(|t| t.id().and_then(|id| id.parse::<i64>().ok()).is_some_and(|id| id < 0))
            .map(|t| t.index())
            .collect();
        for node in &temporary {
            if let Err(err) = self.clear_id(*node) {
                tracing::error!(%node, %err, "cannot purge temporary id");
            }
        }
        temporary.len()
    }

    fn id_less_taxa(&self) -> Vec<TaxonIndex> {
        let forest = self.forest();
        self.pre_order(forest)
            .skip(1)
            .filter(|t| self[*t].id().is_none())
            .collect()
    }
}
