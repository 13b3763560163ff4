//! Error type for loading taxonomies.
//!
//! [LoadError] pairs a [LoadErrorKind] with the line it was found on and the
//! offending text, so a skipped row can be located in the input.

use crate::error::TaxonomyError;
use std::error::Error;
use std::fmt;

/// Maximum number of characters of a row kept as error context
const MAX_CONTEXT_CHARS: usize = 80;

// =#========================================================================#=
// LOAD ERROR KIND
// =#========================================================================#=
/// What went wrong with a row or file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// Row has fewer fields than the header requires.
    TooFewFields { expected: usize, found: usize },
    /// Rank string not recognized; defaulted to "no rank".
    UnknownRank(String),
    /// Flag token not recognized; ignored.
    UnknownFlag(String),
    /// Source reference not of the form `prefix:id`; ignored.
    BadQualifiedId(String),
    /// Taxon row with an empty id.
    MissingId,
    /// Row redefines an id that was already defined.
    Redefined(String),
    /// Synonym or forward refers to an id that names no taxon.
    UnknownOwner(String),
    /// Header row missing or lacking a required column.
    BadHeader(String),
    Io(String),
    /// Row would break the tree (e.g. a cycle) or collides with an existing id.
    Structure(TaxonomyError),
}

// =#========================================================================#=
// LOAD ERROR
// =#========================================================================#=
/// Load error with the 1-based line number (0 if unknown) and row context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    kind: LoadErrorKind,
    line: usize,
    context: String,
}

impl LoadError {
    /// Creates an error without position.
    pub fn new(kind: LoadErrorKind) -> Self {
        LoadError {
            kind,
            line: 0,
            context: String::new(),
        }
    }

    /// Adds the line number and (truncated) row text.
    pub fn at_line(mut self, line: usize, row: &str) -> Self {
        self.line = line;
        self.context = row.chars().take(MAX_CONTEXT_CHARS).collect();
        self
    }

    pub fn kind(&self) -> &LoadErrorKind {
        &self.kind
    }

    /// Line of the offending row, 0 if unknown.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Whether loading cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, LoadErrorKind::Io(_) | LoadErrorKind::BadHeader(_))
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            LoadErrorKind::TooFewFields { expected, found } => {
                write!(f, "Too few fields - expected {expected}, found {found}")?
            }
            LoadErrorKind::UnknownRank(rank) => write!(f, "Unknown rank {rank:?}")?,
            LoadErrorKind::UnknownFlag(flag) => write!(f, "Unknown flag {flag:?}")?,
            LoadErrorKind::BadQualifiedId(id) => write!(f, "Bad source reference {id:?}")?,
            LoadErrorKind::MissingId => write!(f, "Taxon row without id")?,
            LoadErrorKind::Redefined(id) => write!(f, "Id {id} defined twice")?,
            LoadErrorKind::UnknownOwner(id) => write!(f, "No taxon with id {id}")?,
            LoadErrorKind::BadHeader(msg) => write!(f, "Bad header - {msg}")?,
            LoadErrorKind::Io(msg) => write!(f, "IO error - {msg}")?,
            LoadErrorKind::Structure(err) => write!(f, "{err}")?,
        }

        if self.line > 0 {
            write!(f, " at line {}", self.line)?;
        }
        if !self.context.is_empty() {
            write!(f, "\n  Context: {}", self.context)?;
        }
        Ok(())
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            LoadErrorKind::Structure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::new(LoadErrorKind::Io(err.to_string()))
    }
}

impl From<TaxonomyError> for LoadError {
    fn from(err: TaxonomyError) -> Self {
        LoadError::new(LoadErrorKind::Structure(err))
    }
}
