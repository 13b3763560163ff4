//! Input and output of taxonomies.
//!
//! - [loader]: the row-level loader contract, with forward references and
//!   placeholder promotion
//! - [dump]: flat records of taxa and synonyms for writers
//! - [interim]: reader and writer of the tabular interim format
//! - [newick]: Newick output of a subtree

pub mod defs;
pub mod dump;
pub mod error;
pub mod interim;
pub mod loader;
pub mod newick;

pub use dump::{SynonymRecord, TaxonRecord};
pub use error::{LoadError, LoadErrorKind};
pub use interim::{load_taxonomy_dir, write_taxonomy_dir};
pub use loader::{LoadReport, Loader, SynonymRow, TaxonRow};
pub use newick::{NewickStyle, to_newick};
