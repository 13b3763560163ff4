//! Copies of subtrees into new, independent taxonomies.
//!
//! All copies keep names, ranks, proper flags, source references and synonyms.
//! Ids are only copied with [CopyOptions::keep_ids]. The copy's root is
//! attached directly under the new forest, without being flagged unplaced.

use crate::error::TaxonomyError;
use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;
use std::collections::HashMap;

/// Options shared by all subtree copies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Copy ids along with the taxa.
    pub keep_ids: bool,
}

impl CopyOptions {
    pub fn with_ids() -> Self {
        CopyOptions { keep_ids: true }
    }
}

// ============================================================================
// Selection variants (pub)
// ============================================================================
impl Taxonomy {
    /// Copies the whole subtree of `root`.
    pub fn select(&self, root: TaxonIndex, options: CopyOptions) -> Result<Taxonomy, TaxonomyError> {
        self.copy_subtree(root, options, |_, node| self[node].children().to_vec())
    }

    /// Copies the subtree of `root`, leaving out hidden taxa and everything below them.
    ///
    /// The root itself is copied even if hidden.
    pub fn select_visible(&self, root: TaxonIndex, options: CopyOptions) -> Result<Taxonomy, TaxonomyError> {
        self.copy_subtree(root, options, |source, node| {
            source[node]
                .children()
                .iter()
                .copied()
                .filter(|c| !source[*c].is_hidden())
                .collect()
        })
    }

    /// Copies at most `k` taxa of the subtree of `root`, spreading them over
    /// the branches in proportion to branch size.
    ///
    /// Each taxon receives a quota (the root gets `k`). It keeps one slot for
    /// itself and divides the rest among its children by the largest remainder
    /// method over their subtree sizes, so a larger branch never gets fewer
    /// slots than a smaller sibling. A child's quota never exceeds its subtree
    /// size. With `k == 0` the result is empty.
    pub fn sample(&self, root: TaxonIndex, k: usize, options: CopyOptions) -> Result<Taxonomy, TaxonomyError> {
        self.check_live(root)?;
        if k == 0 {
            return Ok(self.empty_copy());
        }
        let quotas = self.sample_quotas(root, k);
        self.copy_subtree(root, options, |source, node| {
            source[node]
                .children()
                .iter()
                .copied()
                .filter(|c| quotas.contains_key(c))
                .collect()
        })
    }

    /// Copies the subtree of `root`, cutting off everything below taxa whose
    /// subtree has at most `min_size` members (those taxa become leaves).
    pub fn chop(&self, root: TaxonIndex, min_size: usize, options: CopyOptions) -> Result<Taxonomy, TaxonomyError> {
        self.copy_subtree(root, options, |source, node| {
            if node != root && source.count(node) <= min_size {
                Vec::new()
            } else {
                source[node].children().to_vec()
            }
        })
    }
}

// ============================================================================
// Copy machinery (private)
// ============================================================================
impl Taxonomy {
    fn empty_copy(&self) -> Taxonomy {
        Taxonomy::new(self.name()).with_config(self.config.clone())
    }

    /// Copies `root` and, recursively, the children chosen by `children_of`.
    fn copy_subtree<F>(&self, root: TaxonIndex, options: CopyOptions, children_of: F) -> Result<Taxonomy, TaxonomyError>
    where
        F: Fn(&Taxonomy, TaxonIndex) -> Vec<TaxonIndex>,
    {
        self.check_live(root)?;
        let mut copy = self.empty_copy();
        let forest = copy.forest();

        let mut stack = vec![(root, forest)];
        while let Some((node, copy_parent)) = stack.pop() {
            let copied = self.copy_taxon(&mut copy, node, options)?;
            copy.attach(copy_parent, copied)?;
            let children = children_of(self, node);
            stack.extend(children.into_iter().rev().map(|c| (c, copied)));
        }
        tracing::debug!(root = %root, copied = copy.num_taxa(), "copied subtree");
        Ok(copy)
    }

    fn copy_taxon(&self, copy: &mut Taxonomy, node: TaxonIndex, options: CopyOptions) -> Result<TaxonIndex, TaxonomyError> {
        let source = &self[node];
        let copied = copy.new_taxon(source.name());
        {
            let target = copy.node_mut(copied);
            target.rank = source.rank();
            target.proper = source.proper_flags();
            target.sources = source.sources().to_vec();
            target.is_division = source.is_division();
        }
        if options.keep_ids {
            if let Some(id) = source.id() {
                copy.bind_id(copied, id)?;
            }
        }
        for synonym in source.synonyms() {
            let synonym = self.synonym(*synonym);
            if synonym.is_live() {
                copy.new_synonym(copied, synonym.name(), synonym.kind(), synonym.sources().to_vec())?;
            }
        }
        Ok(copied)
    }

    /// Distributes `k` slots over the subtree of `root`; taxa without a quota
    /// are left out of the sample.
    fn sample_quotas(&self, root: TaxonIndex, k: usize) -> HashMap<TaxonIndex, usize> {
        let mut quotas = HashMap::new();
        let mut stack = vec![(root, k.min(self.count(root)))];
        while let Some((node, quota)) = stack.pop() {
            quotas.insert(node, quota);
            let remaining = quota - 1;
            if remaining == 0 {
                continue;
            }

            let mut children = self[node].children().to_vec();
            children.sort_by(|a, b| self.count(*b).cmp(&self.count(*a)).then_with(|| self.compare_taxa(*a, *b)));
            let sizes: Vec<usize> = children.iter().map(|c| self.count(*c)).collect();
            for (child, share) in children.into_iter().zip(largest_remainder(remaining, &sizes)) {
                let share = share.min(self.count(child));
                if share > 0 {
                    stack.push((child, share));
                }
            }
        }
        quotas
    }
}

/// Splits `slots` in proportion to `sizes` (sorted descending): every share
/// gets its floor, leftover slots go to the largest remainders, earlier
/// entries first on ties.
fn largest_remainder(slots: usize, sizes: &[usize]) -> Vec<usize> {
    let total: usize = sizes.iter().sum();
    if total == 0 {
        return vec![0; sizes.len()];
    }
    let mut shares: Vec<usize> = sizes.iter().map(|s| slots * s / total).collect();
    let mut leftover = slots - shares.iter().sum::<usize>();

    let mut by_remainder: Vec<usize> = (0..sizes.len()).collect();
    by_remainder.sort_by_key(|i| std::cmp::Reverse(slots * sizes[*i] % total));
    for i in by_remainder {
        if leftover == 0 {
            break;
        }
        shares[i] += 1;
        leftover -= 1;
    }
    shares
}
