//! Classification algorithms deriving metadata from the shape of a taxonomy.
//!
//! All algorithms are inherent methods of
//! [Taxonomy](crate::model::taxonomy::Taxonomy) and assume the tree shape is
//! final for the current pipeline phase:
//! - [lineage]: most recent common ancestor and sibling divergence
//! - [compare]: the tie-break order used to pick among equivalent taxa
//! - [homonym]: resolving names with several bearers, disambiguated display names
//! - [inheritance]: top-down heritable flags, bottom-up barren/extinct inference
//! - [rank_conflict]: flags for children whose ranks disagree with their siblings

pub mod compare;
pub mod homonym;
pub mod inheritance;
pub mod lineage;
pub mod rank_conflict;

pub use homonym::{NameQuery, Resolution};
