//! Container elision.
//!
//! Source taxonomies often group taxa of uncertain placement under pseudo-taxa
//! like "unclassified Bacteria" or "environmental samples". Such containers
//! are emptied: their children move up one level and carry the matching flag
//! instead. The container itself stays as a childless stub so its name and id
//! still resolve.

use crate::error::TaxonomyError;
use crate::event_log::Verdict;
use crate::model::flags::Flags;
use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;
use regex::Regex;
use std::sync::LazyLock;

static CONTAINER_PATTERNS: LazyLock<Vec<(Regex, Flags)>> = LazyLock::new(|| {
    [
        (r"(?i)\benvironmental samples?\b", Flags::ENVIRONMENTAL),
        (r"(?i)\bunclassified\b", Flags::UNCLASSIFIED),
        (r"(?i)\bincertae sedis\b", Flags::INCERTAE_SEDIS),
    ]
    .into_iter()
    .map(|(pattern, flag)| (Regex::new(pattern).expect("container pattern is a valid regex"), flag))
    .collect()
});

/// Returns the flag for children of a container named `name`, if it is one.
pub fn container_flag(name: &str) -> Option<Flags> {
    CONTAINER_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(name))
        .map(|(_, flag)| *flag)
}

impl Taxonomy {
    /// Empties every container, in post-order so that nested containers
    /// collapse into the nearest real ancestor.
    ///
    /// Children are moved to the container's parent and given the container's
    /// flag; the container is flagged `was_container`. Idempotent.
    ///
    /// # Returns
    /// The number of containers emptied.
    pub fn elide_containers(&mut self) -> Result<usize, TaxonomyError> {
        let forest = self.forest();
        let order: Vec<TaxonIndex> = self.post_order(forest).collect();
        let mut emptied = 0;

        for container in order {
            let taxon = &self[container];
            if taxon.children().is_empty() {
                continue;
            }
            let Some(parent) = taxon.parent() else { continue };
            let Some(flag) = taxon.name().and_then(container_flag) else { continue };

            let children = taxon.children().to_vec();
            let moved = children.len();
            for child in children {
                self.reparent(child, parent)?;
                self.node_mut(child).proper |= flag;
            }
            self.node_mut(container).proper |= Flags::WAS_CONTAINER;
            self.record(
                container,
                "elide-container",
                moved,
                Verdict::NoInformation,
                format!("{moved} children moved up"),
            );
            emptied += 1;
        }
        Ok(emptied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_containers() {
        assert_eq!(container_flag("unclassified Bacteria"), Some(Flags::UNCLASSIFIED));
        assert_eq!(container_flag("environmental samples"), Some(Flags::ENVIRONMENTAL));
        assert_eq!(container_flag("Fungi Incertae Sedis"), Some(Flags::INCERTAE_SEDIS));
        assert_eq!(container_flag("Bacteria"), None);
        assert_eq!(container_flag("Unclassifiedia"), None);
    }
}
