//! Homonyms: picking one bearer of a shared name, and naming bearers apart.
//!
//! A name can be borne by several taxa, either as their own name or as a
//! synonym. [Taxonomy::resolve] narrows the bearers using whatever context
//! the caller has (expected division, expected id, a source reference) and
//! falls back to [Taxonomy::compare_taxa] for the final tie-break.

use crate::error::TaxonomyError;
use crate::model::qualified_id::QualifiedId;
use crate::model::rank::Rank;
use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;
use std::cmp::Ordering;

/// Context for resolving a name to a single taxon.
#[derive(Debug, Clone, Default)]
pub struct NameQuery<'a> {
    pub name: &'a str,
    /// Candidates in another division are rejected; candidates without a
    /// division are kept.
    pub division: Option<TaxonIndex>,
    /// A candidate bound to exactly this id wins; candidates bound to another
    /// id are rejected.
    pub id: Option<&'a str>,
    /// Prefer candidates that were built from this source reference.
    pub source: Option<&'a QualifiedId>,
}

impl<'a> NameQuery<'a> {
    pub fn new(name: &'a str) -> Self {
        NameQuery {
            name,
            ..NameQuery::default()
        }
    }

    pub fn with_division(mut self, division: TaxonIndex) -> Self {
        self.division = Some(division);
        self
    }

    pub fn with_id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_source(mut self, source: &'a QualifiedId) -> Self {
        self.source = Some(source);
        self
    }
}

/// Outcome of a name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Unique(TaxonIndex),
    /// Several candidates remain after every tie-break.
    Ambiguous(Vec<TaxonIndex>),
    NotFound,
}

impl Resolution {
    /// The resolved taxon; `None` for ambiguous and missing names.
    pub fn unique(&self) -> Option<TaxonIndex> {
        match self {
            Resolution::Unique(taxon) => Some(*taxon),
            _ => None,
        }
    }
}

impl Taxonomy {
    /// Resolves a name to one of its bearers.
    ///
    /// Steps, each applied to the candidates left by the previous one:
    /// 1. all taxa bearing the name (own name or synonym)
    /// 2. an exact id match wins outright; candidates with another id are rejected
    /// 3. candidates in a different division are rejected
    /// 4. candidates built from the requested source reference are preferred
    /// 5. the first candidate in [Taxonomy::compare_taxa] order wins, unless
    ///    it ties with the second
    ///
    /// Ambiguities are logged with all remaining candidates.
    pub fn resolve(&self, query: &NameQuery) -> Resolution {
        let mut candidates = self.bearers(query.name);
        if candidates.is_empty() {
            return Resolution::NotFound;
        }

        if let Some(id) = query.id {
            if let Some(exact) = candidates.iter().find(|c| self[**c].id() == Some(id)) {
                return Resolution::Unique(*exact);
            }
            candidates.retain(|c| self[*c].id().is_none());
        }

        if let Some(division) = query.division {
            candidates.retain(|c| self.division(*c).is_none_or(|d| d == division));
        }

        if let Some(source) = query.source {
            let matching: Vec<TaxonIndex> = candidates
                .iter()
                .copied()
                .filter(|c| self[*c].sources().contains(source))
                .collect();
            if !matching.is_empty() {
                candidates = matching;
            }
        }

        match candidates.len() {
            0 => return Resolution::NotFound,
            1 => return Resolution::Unique(candidates[0]),
            _ => {}
        }

        candidates.sort_by(|a, b| self.compare_taxa(*a, *b));
        if self.compare_taxa(candidates[0], candidates[1]) == Ordering::Less {
            return Resolution::Unique(candidates[0]);
        }
        let best = candidates[0];
        candidates.retain(|c| self.compare_taxa(best, *c) == Ordering::Equal);
        tracing::warn!(
            name = query.name,
            candidates = ?candidates,
            "ambiguous name after tie-breaking"
        );
        Resolution::Ambiguous(candidates)
    }

    /// Looks up the single taxon carrying `name` as its own name.
    ///
    /// No tie-break is applied; use [Taxonomy::resolve] when context is available.
    ///
    /// # Errors
    /// [TaxonomyError::AmbiguousName] if several taxa carry the name.
    pub fn lookup_unique(&self, name: &str) -> Result<Option<TaxonIndex>, TaxonomyError> {
        let mut taxa = self.taxa_named(name);
        match taxa.len() {
            0 => Ok(None),
            1 => Ok(taxa.pop()),
            _ => {
                taxa.sort();
                tracing::warn!(name, candidates = ?taxa, "ambiguous name lookup");
                Err(TaxonomyError::AmbiguousName {
                    name: name.to_string(),
                    candidates: taxa,
                })
            }
        }
    }

    /// Returns a display name telling `node` apart from the other bearers of
    /// its name, or an empty string when the plain name is already unique.
    ///
    /// The qualifier is the nearest named ancestor that contains none of the
    /// other bearers, e.g. `"Morus (genus in Moraceae)"`. If no such ancestor
    /// exists, the id or the first source reference is used instead.
    pub fn unique_name(&self, node: TaxonIndex) -> String {
        let Some(name) = self[node].name() else {
            return String::new();
        };
        let others: Vec<TaxonIndex> = self.bearers(name).into_iter().filter(|b| *b != node).collect();
        if others.is_empty() {
            return String::new();
        }

        let forest = self.forest();
        for ancestor in self.ancestors(node) {
            if ancestor == forest || others.iter().any(|o| self.is_ancestor_or_self(ancestor, *o)) {
                break;
            }
            let Some(ancestor_name) = self[ancestor].name() else { continue };
            if ancestor_name == name {
                continue;
            }
            return match self[node].rank() {
                Rank::NoRank => format!("{name} (in {ancestor_name})"),
                rank => format!("{name} ({rank} in {ancestor_name})"),
            };
        }

        let taxon = &self[node];
        match (taxon.id(), taxon.sources().first()) {
            (Some(id), _) => format!("{name} (id {id})"),
            (None, Some(source)) => format!("{name} ({source})"),
            (None, None) => format!("{name} ({})", node),
        }
    }
}
