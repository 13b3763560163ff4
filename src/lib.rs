//! Taxotree is a library for building, reconciling and cleaning up
//! biological classification hierarchies ("taxonomies").
//!
//! Core functionality provided:
//! - Tree engine: a [Taxonomy] holds taxa and synonyms in arenas together with
//!   a name index and an id index that are kept consistent under every
//!   mutation (attach, detach, reparent, prune, elide, absorb).
//! - Flag algebra: proper and inferred [Flags] with a stable string encoding,
//!   including legacy spellings.
//! - Classification algorithms: MRCA, divergence, homonym resolution,
//!   flag inheritance, barren/extinct inference, rank-conflict detection.
//!   See [crate::algo].
//! - Topology normalizers: container elision, smushing of sibling homonyms,
//!   redundant-node elision, root normalization, subtree selection and
//!   sampling, id assignment. See [crate::normalize].
//! - Cross-taxonomy [Alignment] context and an id-minting boundary for new
//!   taxa ([additions]).
//! - IO: a row-level [Loader], the tabular interim format and Newick output.
//!   See [crate::io].
//!
//! Limitations:
//! - Single-threaded: a taxonomy is built, normalized and then read
//! - Cached counts, depths and divisions are valid only once the tree shape
//!   is final for a pipeline phase
//!
//! # Usage patterns
//! 1. Load an interim-format directory with [load_taxonomy_dir] and run the
//!    post-load pipeline ([Taxonomy::post_load]).
//! 2. Build a taxonomy by hand with [Taxonomy::new_taxon] and the structural
//!    operations, or feed rows into a [Loader].
//!
//! ## Example
//! ```
//! use taxotree::{Flags, Rank, Taxonomy};
//!
//! let mut tax = Taxonomy::new("demo");
//! let life = tax.new_taxon(Some("life"));
//! tax.add_root(life)?;
//! let bacteria = tax.new_taxon(Some("Bacteria"));
//! tax.attach(life, bacteria)?;
//! let foo = tax.new_taxon(Some("Foo"));
//! tax.set_rank(foo, Rank::Genus)?;
//! tax.bind_id(foo, "11")?;
//! tax.attach_with_flags(bacteria, foo, Flags::INCERTAE_SEDIS)?;
//!
//! tax.infer_flags();
//! assert_eq!(tax.count(life), 3);
//! assert!(tax[foo].is_hidden());
//!
//! tax.prune(foo, "demo")?;
//! assert_eq!(tax.lookup_id("11"), None);
//! assert_eq!(tax.count(life), 2);
//! # Ok::<(), taxotree::TaxonomyError>(())
//! ```
//!
//! ## Example loading and writing
//! ```no_run
//! use taxotree::{load_taxonomy_dir, write_taxonomy_dir, Taxonomy, TaxonomyConfig};
//!
//! let config = TaxonomyConfig::from_json_file("taxonomy.json")?;
//! let (mut tax, report) = load_taxonomy_dir("ncbi/", Taxonomy::new("ncbi").with_config(config))?;
//! println!("loaded {} rows, skipped {}", report.rows, report.skipped);
//!
//! tax.post_load()?;
//! tax.assign_new_ids(0);
//! write_taxonomy_dir(&tax, "out/")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod additions;
pub mod algo;
pub mod alignment;
pub mod config;
pub mod error;
pub mod event_log;
pub mod io;
pub mod model;
pub mod normalize;

pub use additions::{AdditionRequest, IdMinter, ParentRef, SequentialMinter};
pub use algo::{NameQuery, Resolution};
pub use alignment::Alignment;
pub use config::{ContainerRedirect, TaxonomyConfig};
pub use error::TaxonomyError;
pub use event_log::{EventLog, Interest, Verdict};
pub use io::{LoadError, LoadReport, Loader, load_taxonomy_dir, write_taxonomy_dir};
pub use model::{Flags, QualifiedId, Rank, TaxonIndex, Taxonomy};
pub use normalize::{CopyOptions, PostLoadReport};

use std::path::Path;

// ============================================================================
// Quick API
// ============================================================================
/// Loads an interim-format directory with default configuration and runs the
/// post-load pipeline.
///
/// # Arguments
/// * `dir` - Directory holding `taxonomy.tsv` (and optionally `synonyms.tsv`, `forwards.tsv`)
/// * `name` - Name of the taxonomy, e.g. its source prefix
///
/// # Errors
/// I/O failures, unusable headers, and structural failures of the pipeline.
pub fn load_and_normalize<P: AsRef<Path>>(
    dir: P,
    name: &str,
) -> Result<(Taxonomy, LoadReport), Box<dyn std::error::Error>> {
    let (mut taxonomy, report) = load_taxonomy_dir(dir, Taxonomy::new(name))?;
    taxonomy.post_load()?;
    Ok((taxonomy, report))
}
