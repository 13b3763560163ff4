//! Tie-break order among taxa that are otherwise equally good choices.

use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;
use std::cmp::Ordering;

impl Taxonomy {
    /// Orders taxa by preference: more children first, then shorter id,
    /// then lexicographically smaller id. Taxa without id come last.
    ///
    /// `Ordering::Equal` means there is no rule to choose between the two.
    pub fn compare_taxa(&self, a: TaxonIndex, b: TaxonIndex) -> Ordering {
        let (a, b) = (&self[a], &self[b]);
        b.children()
            .len()
            .cmp(&a.children().len())
            .then_with(|| compare_ids(a.id(), b.id()))
    }
}

fn compare_ids(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
