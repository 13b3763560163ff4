//! Flag inference: heritable flags flow down, barren and extinct flow up.

use crate::model::flags::Flags;
use crate::model::rank::Rank;
use crate::model::taxonomy::Taxonomy;

impl Taxonomy {
    /// Recomputes the inferred flags of every live taxon.
    ///
    /// 1. Top-down: the inferred set becomes the heritable part of the
    ///    parent's flags, plus `infraspecific` below a species-rank (or finer)
    ///    ancestor.
    /// 2. Bottom-up: `barren` when no taxon of species rank or finer exists in
    ///    the subtree (a childless unranked leaf counts as a possible species);
    ///    `extinct` when every child is extinct.
    ///
    /// Taxa that became extinct in step 2 pass that on to their descendants,
    /// so afterwards every inferred set contains the heritable flags of its
    /// parent. Both passes iterate over a precomputed pre-order.
    pub fn infer_flags(&mut self) {
        let forest = self.forest();
        let order: Vec<_> = self.pre_order(forest).collect();
        self.node_mut(forest).inferred = Flags::empty();

        for &index in order.iter().skip(1) {
            let Some(parent) = self.nodes[index.slot()].parent else { continue };
            let parent = &self.nodes[parent.slot()];
            let mut inferred = parent.flags() & Flags::HERITABLE;
            if parent.rank.is_species_or_finer() || parent.inferred.contains(Flags::INFRASPECIFIC) {
                inferred |= Flags::INFRASPECIFIC;
            }
            self.nodes[index.slot()].inferred = inferred;
        }

        // Reverse pre-order visits children before their parents.
        let mut has_species = vec![false; self.nodes.len()];
        let mut became_extinct = false;
        for &index in order.iter().skip(1).rev() {
            let taxon = &self.nodes[index.slot()];
            let here = taxon.rank.is_species_or_finer()
                || (taxon.children.is_empty() && taxon.rank == Rank::NoRank);
            let below = taxon.children.iter().any(|c| has_species[c.slot()]);
            has_species[index.slot()] = here || below;

            let all_extinct = !taxon.children.is_empty()
                && taxon
                    .children
                    .iter()
                    .all(|c| self.nodes[c.slot()].flags().contains(Flags::EXTINCT));

            let taxon = &mut self.nodes[index.slot()];
            if !has_species[index.slot()] {
                taxon.inferred |= Flags::BARREN;
            }
            if all_extinct && !taxon.flags().contains(Flags::EXTINCT) {
                taxon.inferred |= Flags::EXTINCT;
                became_extinct = true;
            }
        }

        if became_extinct {
            for &index in order.iter().skip(1) {
                let Some(parent) = self.nodes[index.slot()].parent else { continue };
                let heritable = self.nodes[parent.slot()].flags() & Flags::HERITABLE;
                self.nodes[index.slot()].inferred |= heritable;
            }
        }
    }
}
