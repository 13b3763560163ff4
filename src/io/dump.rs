//! Dump contract: flat records of every live taxon and synonym, in pre-order.
//!
//! Writers of any format consume these records instead of walking the tree.

use crate::model::flags::encode_flags;
use crate::model::qualified_id::QualifiedId;
use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;
use serde::Serialize;

/// One taxon, ready for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonRecord {
    pub id: String,
    /// Empty for roots.
    pub parent_id: String,
    pub name: String,
    pub rank: String,
    /// Comma-joined source references.
    pub sources: String,
    /// Disambiguated name, empty if the name is unique.
    pub unique_name: String,
    pub flags: String,
}

/// One synonym, ready for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynonymRecord {
    pub name: String,
    pub owner_id: String,
    pub kind: String,
    /// Disambiguated name of the owner (its plain name if unique).
    pub owner_name: String,
    pub sources: String,
}

impl Taxonomy {
    /// Returns a record per live taxon, parents before children.
    ///
    /// A taxon without id gets an empty `id`, and its children an empty
    /// `parent_id`, as roots do; file writers refuse such records.
    pub fn taxon_records(&self) -> Vec<TaxonRecord> {
        let forest = self.forest();
        self.pre_order(forest)
            .skip(1)
            .map(|node| {
                let taxon = &self[node];
                TaxonRecord {
                    id: taxon.id().unwrap_or_default().to_string(),
                    parent_id: taxon
                        .parent()
                        .filter(|p| *p != forest)
                        .and_then(|p| self[p].id())
                        .unwrap_or_default()
                        .to_string(),
                    name: taxon.name().unwrap_or_default().to_string(),
                    rank: taxon.rank_label().to_string(),
                    sources: QualifiedId::join(taxon.sources()),
                    unique_name: self.unique_name(node),
                    flags: encode_flags(taxon.proper_flags(), taxon.inferred_flags()),
                }
            })
            .collect()
    }

    /// Returns a record per live synonym whose owner has an id, in owner pre-order.
    pub fn synonym_records(&self) -> Vec<SynonymRecord> {
        let forest = self.forest();
        let mut records = Vec::new();
        for node in self.pre_order(forest).skip(1) {
            let taxon = &self[node];
            let Some(owner_id) = taxon.id() else { continue };
            for synonym in taxon.synonyms().iter().map(|s| self.synonym(*s)) {
                if !synonym.is_live() {
                    continue;
                }
                records.push(SynonymRecord {
                    name: synonym.name().to_string(),
                    owner_id: owner_id.to_string(),
                    kind: synonym.kind().to_string(),
                    owner_name: self.display_unique_name(node),
                    sources: QualifiedId::join(synonym.sources()),
                });
            }
        }
        records
    }

    /// Returns (alias, canonical id) for every id bound to a live taxon other
    /// than its primary id, sorted by alias.
    pub fn forward_records(&self) -> Vec<(String, String)> {
        let mut forwards: Vec<(String, String)> = self
            .registry
            .ids()
            .filter_map(|(id, node)| {
                let taxon = &self[node];
                let canonical = taxon.id()?;
                (!taxon.is_pruned() && canonical != id).then(|| (id.to_string(), canonical.to_string()))
            })
            .collect();
        forwards.sort();
        forwards
    }

    fn display_unique_name(&self, node: TaxonIndex) -> String {
        let unique = self.unique_name(node);
        if unique.is_empty() {
            self[node].name().unwrap_or_default().to_string()
        } else {
            unique
        }
    }
}
