//! Most recent common ancestor and divergence of two taxa.

use crate::error::TaxonomyError;
use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;

impl Taxonomy {
    /// Returns the most recent common ancestor of `a` and `b`.
    ///
    /// Both taxa are first brought to equal depth (using cached depths, which
    /// are recomputed if stale), then walked upward together until they meet.
    /// A taxon counts as its own ancestor, so `mrca(a, a) == a`.
    ///
    /// # Returns
    /// `None` if the two are in different trees (e.g. one is detached).
    ///
    /// # Errors
    /// [TaxonomyError::ForeignTaxonomy] if a handle belongs to another taxonomy.
    pub fn mrca(&self, a: TaxonIndex, b: TaxonIndex) -> Result<Option<TaxonIndex>, TaxonomyError> {
        self.check_member(a)?;
        self.check_member(b)?;

        let (mut a, mut b) = (a, b);
        let (mut depth_a, mut depth_b) = (self.depth(a), self.depth(b));
        while depth_a > depth_b {
            let Some(parent) = self[a].parent() else { return Ok(None) };
            a = parent;
            depth_a -= 1;
        }
        while depth_b > depth_a {
            let Some(parent) = self[b].parent() else { return Ok(None) };
            b = parent;
            depth_b -= 1;
        }
        while a != b {
            match (self[a].parent(), self[b].parent()) {
                (Some(parent_a), Some(parent_b)) => {
                    a = parent_a;
                    b = parent_b;
                }
                _ => return Ok(None),
            }
        }
        Ok(Some(a))
    }

    /// Returns the pair of siblings at which the lineages of `a` and `b` split.
    ///
    /// The result `(a', b')` has `a'` an ancestor-or-self of `a`, `b'` an
    /// ancestor-or-self of `b`, and `a'` and `b'` share a parent.
    ///
    /// # Returns
    /// `None` if one taxon contains the other, if `a` and `b` already share a
    /// parent, or if they are in different trees.
    ///
    /// # Errors
    /// [TaxonomyError::ForeignTaxonomy] if a handle belongs to another taxonomy;
    /// use [Alignment::divergence](crate::alignment::Alignment::divergence) to
    /// compare taxa of different taxonomies.
    pub fn divergence(
        &self,
        a: TaxonIndex,
        b: TaxonIndex,
    ) -> Result<Option<(TaxonIndex, TaxonIndex)>, TaxonomyError> {
        self.check_member(a)?;
        self.check_member(b)?;
        if a == b || (self[a].parent().is_some() && self[a].parent() == self[b].parent()) {
            return Ok(None);
        }

        let (mut a, mut b) = (a, b);
        let (mut depth_a, mut depth_b) = (self.depth(a), self.depth(b));
        while depth_a > depth_b {
            let Some(parent) = self[a].parent() else { return Ok(None) };
            a = parent;
            depth_a -= 1;
        }
        while depth_b > depth_a {
            let Some(parent) = self[b].parent() else { return Ok(None) };
            b = parent;
            depth_b -= 1;
        }
        if a == b {
            return Ok(None);
        }

        loop {
            match (self[a].parent(), self[b].parent()) {
                (Some(parent_a), Some(parent_b)) if parent_a == parent_b => return Ok(Some((a, b))),
                (Some(parent_a), Some(parent_b)) => {
                    a = parent_a;
                    b = parent_b;
                }
                _ => return Ok(None),
            }
        }
    }
}
