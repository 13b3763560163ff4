//! Constants of the tabular interim format.

/// Separator between fields of a row.
pub const FIELD_SEPARATOR: &str = "\t|\t";

/// Optional terminator some writers append to every row.
pub(crate) const ROW_TERMINATOR: &str = "\t|";

pub const TAXONOMY_FILE: &str = "taxonomy.tsv";
pub const SYNONYMS_FILE: &str = "synonyms.tsv";
pub const FORWARDS_FILE: &str = "forwards.tsv";

// Taxonomy columns
pub(crate) const UID: &str = "uid";
pub(crate) const PARENT_UID: &str = "parent_uid";
pub(crate) const NAME: &str = "name";
pub(crate) const RANK: &str = "rank";
pub(crate) const SOURCE_INFO: &str = "sourceinfo";
pub(crate) const UNIQUE_NAME: &str = "uniqname";
pub(crate) const FLAGS: &str = "flags";

pub(crate) const TAXONOMY_COLUMNS: [&str; 7] = [UID, PARENT_UID, NAME, RANK, SOURCE_INFO, UNIQUE_NAME, FLAGS];

// Synonym columns
pub(crate) const TYPE: &str = "type";

pub(crate) const SYNONYM_COLUMNS: [&str; 5] = [NAME, UID, TYPE, UNIQUE_NAME, SOURCE_INFO];

// Forward columns
pub(crate) const ID: &str = "id";
pub(crate) const REPLACEMENT: &str = "replacement";

pub(crate) const FORWARD_COLUMNS: [&str; 2] = [ID, REPLACEMENT];

/// Synonym type used when a row leaves the type empty.
pub const DEFAULT_SYNONYM_TYPE: &str = "synonym";

/// Synonym types that do not name the taxon and are dropped on load.
pub const DROPPED_SYNONYM_TYPES: &[&str] = &[
    "authority",
    "type material",
    "blast name",
    "genbank acronym",
    "acronym",
    "includes",
    "in-part",
];
