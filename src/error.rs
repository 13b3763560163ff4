//! Error types of the tree engine.

use crate::model::taxon::TaxonIndex;

/// Errors raised by structural and identity operations on a taxonomy.
///
/// A failed operation leaves the taxonomy unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaxonomyError {
    /// Attaching would make a taxon its own ancestor.
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: TaxonIndex, child: TaxonIndex },

    /// Operands belong to different taxonomy instances.
    #[error("{0} does not belong to this taxonomy")]
    ForeignTaxonomy(TaxonIndex),

    /// Only detached taxa can be attached.
    #[error("{child} is already attached to {parent}")]
    AlreadyAttached { child: TaxonIndex, parent: TaxonIndex },

    /// Id is already bound to another live taxon; the existing binding wins.
    #[error("id {id} is already bound to {existing}")]
    IdCollision { id: String, existing: TaxonIndex },

    /// A name lookup without enough context matched several taxa.
    #[error("name {name:?} is ambiguous ({} candidates)", candidates.len())]
    AmbiguousName { name: String, candidates: Vec<TaxonIndex> },

    /// The taxon was pruned and is read-only.
    #[error("{0} has been pruned")]
    PrunedTaxon(TaxonIndex),

    /// The operation needs a taxon that has a parent.
    #[error("{0} is detached")]
    Detached(TaxonIndex),
}
