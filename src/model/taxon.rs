//! Entity model: taxa, synonyms and the handles referring to them.
//!
//! Taxa and synonyms live in arenas owned by a
//! [Taxonomy](crate::model::taxonomy::Taxonomy) and are referred to by
//! [TaxonIndex] and [SynonymIndex] handles. Handles carry the tag of their
//! taxonomy, so using a handle with the wrong taxonomy is detected instead of
//! silently reading an unrelated node. Slots are never reused: pruned taxa stay
//! in the arena as read-only tombstones, so handles cannot dangle.

use crate::model::flags::Flags;
use crate::model::qualified_id::QualifiedId;
use crate::model::rank::Rank;
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Slot of the synthetic forest root in every taxonomy.
pub(crate) const FOREST_SLOT: usize = 0;

static NEXT_TAXONOMY_TAG: AtomicU32 = AtomicU32::new(1);

// =#========================================================================#=
// HANDLES
// =#========================================================================#=
/// Process-unique tag of a taxonomy instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaxonomyTag(u32);

impl TaxonomyTag {
    pub(crate) fn fresh() -> Self {
        TaxonomyTag(NEXT_TAXONOMY_TAG.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle of a taxon within its taxonomy's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaxonIndex {
    taxonomy: TaxonomyTag,
    slot: u32,
}

impl TaxonIndex {
    pub(crate) fn new(taxonomy: TaxonomyTag, slot: usize) -> Self {
        TaxonIndex {
            taxonomy,
            slot: slot as u32,
        }
    }

    /// Returns the tag of the taxonomy this handle belongs to.
    pub fn taxonomy(self) -> TaxonomyTag {
        self.taxonomy
    }

    pub(crate) fn slot(self) -> usize {
        self.slot as usize
    }
}

impl fmt::Display for TaxonIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "taxon#{}@{}", self.slot, self.taxonomy.0)
    }
}

/// Handle of a synonym within its taxonomy's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SynonymIndex {
    taxonomy: TaxonomyTag,
    slot: u32,
}

impl SynonymIndex {
    pub(crate) fn new(taxonomy: TaxonomyTag, slot: usize) -> Self {
        SynonymIndex {
            taxonomy,
            slot: slot as u32,
        }
    }

    /// Returns the tag of the taxonomy this handle belongs to.
    pub fn taxonomy(self) -> TaxonomyTag {
        self.taxonomy
    }

    pub(crate) fn slot(self) -> usize {
        self.slot as usize
    }
}

/// Anything registered under a name: a taxon or a synonym.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Taxon(TaxonIndex),
    Synonym(SynonymIndex),
}

// =#========================================================================#=
// TAXON
// =#========================================================================#=
/// A structural node of a taxonomy.
///
/// Fields can only be changed through the owning taxonomy, which keeps the
/// name and id indices and the parent/child links consistent.
///
/// # Invariants
/// - `c` is in `p.children` iff `c.parent == Some(p)`
/// - `proper` and `inferred` flags are kept separately; [Taxon::flags] is their union
/// - cached `count`, `depth` and `division` are `None` while stale
#[derive(Debug, Clone)]
pub struct Taxon {
    pub(crate) index: TaxonIndex,
    pub(crate) name: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) rank: Rank,
    pub(crate) parent: Option<TaxonIndex>,
    pub(crate) children: Vec<TaxonIndex>,
    pub(crate) sources: Vec<QualifiedId>,
    pub(crate) proper: Flags,
    pub(crate) inferred: Flags,
    pub(crate) synonyms: Vec<SynonymIndex>,
    pub(crate) pruned: bool,
    pub(crate) is_division: bool,
    pub(crate) count: Cell<Option<usize>>,
    pub(crate) depth: Cell<Option<usize>>,
    pub(crate) division: Cell<Option<Option<TaxonIndex>>>,
}

impl Taxon {
    pub(crate) fn new(index: TaxonIndex, name: Option<String>) -> Self {
        Taxon {
            index,
            name,
            id: None,
            rank: Rank::NoRank,
            parent: None,
            children: Vec::new(),
            sources: Vec::new(),
            proper: Flags::empty(),
            inferred: Flags::empty(),
            synonyms: Vec::new(),
            pruned: false,
            is_division: false,
            count: Cell::new(None),
            depth: Cell::new(None),
            division: Cell::new(None),
        }
    }

    /// Returns the handle of this taxon.
    pub fn index(&self) -> TaxonIndex {
        self.index
    }

    /// Returns the name, or `None` for anonymous taxa.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the stable external id, if assigned.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Returns the parent, `None` if detached (or for the forest itself).
    pub fn parent(&self) -> Option<TaxonIndex> {
        self.parent
    }

    pub fn children(&self) -> &[TaxonIndex] {
        &self.children
    }

    /// Returns whether this taxon has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the qualified references this taxon was built from.
    pub fn sources(&self) -> &[QualifiedId] {
        &self.sources
    }

    /// Flags asserted of exactly this taxon.
    pub fn proper_flags(&self) -> Flags {
        self.proper
    }

    /// Flags implied by ancestors or descendants.
    pub fn inferred_flags(&self) -> Flags {
        self.inferred
    }

    /// Union of proper and inferred flags.
    pub fn flags(&self) -> Flags {
        self.proper | self.inferred
    }

    pub fn synonyms(&self) -> &[SynonymIndex] {
        &self.synonyms
    }

    /// Whether this taxon has been pruned; pruned taxa are read-only tombstones.
    pub fn is_pruned(&self) -> bool {
        self.pruned
    }

    /// Whether this is the synthetic forest root.
    pub fn is_forest(&self) -> bool {
        self.index.slot() == FOREST_SLOT
    }

    /// Whether this taxon is marked as a division (a lineage used to tell homonyms apart).
    pub fn is_division(&self) -> bool {
        self.is_division
    }

    /// Effective hidden status: some hiding flag is set (directly or inherited)
    /// and [Flags::FORCED_VISIBLE] is not.
    pub fn is_hidden(&self) -> bool {
        self.flags().intersects(Flags::HIDING) && !self.proper.contains(Flags::FORCED_VISIBLE)
    }

    /// Whether this taxon is an emptied container that must not regain children.
    pub fn is_former_container(&self) -> bool {
        self.proper.intersects(Flags::FORMER_CONTAINER)
    }

    /// Whether placement of this taxon is unplaced, directly or inherited.
    pub fn is_unplaced(&self) -> bool {
        self.flags().contains(Flags::UNPLACED)
    }

    /// Rank label for output: falls back to "no rank" / "no rank - terminal".
    pub fn rank_label(&self) -> &'static str {
        match self.rank {
            Rank::NoRank if self.children.is_empty() => crate::model::rank::NO_RANK_TERMINAL_LABEL,
            rank => rank.name(),
        }
    }

    /// Name for log messages.
    pub(crate) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

// =#========================================================================#=
// SYNONYM
// =#========================================================================#=
/// An alternate name bound to a taxon; never part of the tree structure.
#[derive(Debug, Clone)]
pub struct Synonym {
    pub(crate) index: SynonymIndex,
    pub(crate) name: String,
    pub(crate) owner: TaxonIndex,
    pub(crate) kind: String,
    pub(crate) sources: Vec<QualifiedId>,
    pub(crate) id: Option<String>,
    pub(crate) live: bool,
}

impl Synonym {
    pub fn index(&self) -> SynonymIndex {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the taxon this synonym names.
    pub fn owner(&self) -> TaxonIndex {
        self.owner
    }

    /// Returns the synonym type tag, e.g. "synonym" or "common name".
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn sources(&self) -> &[QualifiedId] {
        &self.sources
    }

    /// Returns the source's own id for this synonym, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Whether this synonym is still registered (its owner is not pruned).
    pub fn is_live(&self) -> bool {
        self.live
    }
}
