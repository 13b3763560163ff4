//! Data model of a taxonomy.
//!
//! # Representation
//! A [Taxonomy] stores [Taxon] nodes and [Synonym]s in arenas, referenced by
//! [TaxonIndex] and [SynonymIndex] handles. A synthetic forest root owns all
//! roots. The [Registry] maps names to entities and external ids to taxa.
//!
//! | Type | Role |
//! |------|------|
//! | [Taxon] | structural node: name, id, rank, parent/children, sources, flags |
//! | [Synonym] | alternate name of a taxon, not part of the tree |
//! | [Flags] | proper and inferred annotations, see [flags] |
//! | [Rank] | enumerated taxonomic level |
//! | [QualifiedId] | `prefix:id` provenance reference |
//!
//! # Mutation
//! All changes to names, ids and parent links go through [Taxonomy], which
//! keeps both indices and the cached subtree values consistent.

pub mod flags;
pub mod qualified_id;
pub mod rank;
pub mod registry;
pub mod taxon;
pub mod taxonomy;

pub use flags::Flags;
pub use qualified_id::QualifiedId;
pub use rank::Rank;
pub use registry::Registry;
pub use taxon::{Entity, Synonym, SynonymIndex, Taxon, TaxonIndex, TaxonomyTag};
pub use taxonomy::Taxonomy;
