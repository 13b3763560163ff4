//! Configuration of a taxonomy and its post-load pipeline.
//!
//! All fields have defaults, so a partial JSON document is enough:
//! ```
//! use taxotree::config::{ContainerRedirect, TaxonomyConfig};
//!
//! let config = TaxonomyConfig::from_json_str(r#"{"deforest": true}"#).unwrap();
//! assert!(config.deforest);
//! assert_eq!(config.top_name, "life");
//! assert_eq!(config.container_redirect, ContainerRedirect::DivisionThenParent);
//! ```

use crate::event_log::Interest;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default name of the designated top taxon.
pub const DEFAULT_TOP_NAME: &str = "life";

/// Default factor by which the largest root must outsize the second largest.
pub const DEFAULT_ROOT_DOMINANCE: usize = 1000;

/// Where a child goes when someone attaches it to an emptied container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRedirect {
    /// The container's division, else its parent, else the forest.
    #[default]
    DivisionThenParent,
    /// The container's parent, else the forest.
    ParentOnly,
}

/// Tunables of a [Taxonomy](crate::model::taxonomy::Taxonomy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    /// Roots with this name are not marked unplaced and sort first.
    pub top_name: String,
    /// Redirect policy for attaches onto former containers.
    pub container_redirect: ContainerRedirect,
    /// Largest root must be at least this many times larger than the second one.
    pub root_dominance: usize,
    /// Whether rank-conflict detection sets `major_rank_conflict`.
    pub major_rank_conflicts: bool,
    /// Whether the post-load pipeline merges all roots under the largest one.
    pub deforest: bool,
    /// Interest predicates of the event log.
    pub interest: Interest,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        TaxonomyConfig {
            top_name: DEFAULT_TOP_NAME.to_string(),
            container_redirect: ContainerRedirect::default(),
            root_dominance: DEFAULT_ROOT_DOMINANCE,
            major_rank_conflicts: true,
            deforest: false,
            interest: Interest::default(),
        }
    }
}

/// Errors reading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl TaxonomyConfig {
    /// Parses a configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
