//! Qualified references (`prefix:id`) recording where a taxon's data came from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A `source-prefix:local-id` pair, e.g. `ncbi:9606`.
///
/// The prefix is everything before the first colon, so URLs such as
/// `http://example.org/x` also round-trip (prefix `http`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedId {
    prefix: String,
    id: String,
}

impl QualifiedId {
    /// Creates a new qualified id.
    pub fn new(prefix: impl Into<String>, id: impl Into<String>) -> Self {
        QualifiedId {
            prefix: prefix.into(),
            id: id.into(),
        }
    }

    /// Returns the source prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the id local to the source.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parses a comma-separated list of qualified ids.
    ///
    /// # Returns
    /// The parsed ids together with all tokens that could not be parsed.
    pub fn parse_list(s: &str) -> (Vec<QualifiedId>, Vec<String>) {
        let mut ids = Vec::new();
        let mut bad = Vec::new();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.parse() {
                Ok(qid) => ids.push(qid),
                Err(_) => bad.push(token.to_string()),
            }
        }
        (ids, bad)
    }

    /// Joins a list of qualified ids with commas.
    pub fn join(ids: &[QualifiedId]) -> String {
        ids.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for QualifiedId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.id)
    }
}

/// Error for strings lacking a non-empty prefix or id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a qualified id (expected prefix:id): {0:?}")]
pub struct BadQualifiedId(pub String);

impl FromStr for QualifiedId {
    type Err = BadQualifiedId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((prefix, id)) if !prefix.is_empty() && !id.is_empty() => {
                Ok(QualifiedId::new(prefix, id))
            }
            _ => Err(BadQualifiedId(s.to_string())),
        }
    }
}
