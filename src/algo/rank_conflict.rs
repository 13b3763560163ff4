//! Sibling rank conflicts.
//!
//! Children of one parent are expected to have comparable ranks. A genus
//! next to an order under the same family is suspicious; such children are
//! flagged so that they can be hidden downstream.

use crate::event_log::Verdict;
use crate::model::flags::Flags;
use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;

impl Taxonomy {
    /// Flags children whose ranks disagree with their siblings'.
    ///
    /// For each parent, among its ranked children:
    /// - a child coarser than the finest sibling gets `sibling_higher`
    /// - a child finer than the coarsest sibling gets `sibling_lower`
    /// - if enabled in the configuration, a child more than one rank tier
    ///   coarser than the finest sibling gets `major_rank_conflict`
    ///
    /// Sibling flags from earlier runs are cleared first.
    ///
    /// # Returns
    /// The number of taxa flagged `sibling_higher`.
    pub fn analyze_rank_conflicts(&mut self) -> usize {
        let major = self.config.major_rank_conflicts;
        for taxon in &mut self.nodes {
            taxon.proper.remove(Flags::SIBLING_HIGHER | Flags::SIBLING_LOWER);
        }

        let forest = self.forest();
        let parents: Vec<TaxonIndex> = self.pre_order(forest).filter(|p| *p != forest).collect();
        let mut flagged = 0;
        for parent in parents {
            let ranked: Vec<(TaxonIndex, u16, u8)> = self.nodes[parent.slot()]
                .children
                .iter()
                .filter_map(|c| {
                    let rank = self.nodes[c.slot()].rank;
                    Some((*c, rank.level()?, rank.tier()?))
                })
                .collect();
            if ranked.len() < 2 {
                continue;
            }
            let Some(&(_, best, _)) = ranked.iter().min_by_key(|(_, level, _)| *level) else { continue };
            let Some(&(_, worst, worst_tier)) = ranked.iter().max_by_key(|(_, level, _)| *level) else {
                continue;
            };
            if best == worst {
                continue;
            }

            for (child, level, tier) in ranked {
                if level > best {
                    self.nodes[child.slot()].proper |= Flags::SIBLING_LOWER;
                }
                if level < worst {
                    self.nodes[child.slot()].proper |= Flags::SIBLING_HIGHER;
                    flagged += 1;
                    if major && worst_tier.saturating_sub(tier) > 1 {
                        self.nodes[child.slot()].proper |= Flags::MAJOR_RANK_CONFLICT;
                        let detail = format!("{} tiers above its finest sibling", worst_tier - tier);
                        self.record(child, "major-rank-conflict", 1, Verdict::Interesting, detail);
                    }
                }
            }
        }
        flagged
    }
}
