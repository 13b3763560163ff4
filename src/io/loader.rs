//! Row-level loader: builds a taxonomy from taxon, synonym and forward rows.
//!
//! Rows may come in any order. A parent id seen before its own row gets a
//! detached placeholder taxon, which is filled in when the row arrives.
//! [Loader::finish] promotes placeholders that never got a row to roots.
//!
//! Bad fields are defaulted and reported as warnings; bad rows are skipped.
//! Loading never stops because of a single row.

use crate::io::defs::{DEFAULT_SYNONYM_TYPE, DROPPED_SYNONYM_TYPES};
use crate::io::error::{LoadError, LoadErrorKind};
use crate::model::flags::parse_flags;
use crate::model::qualified_id::QualifiedId;
use crate::model::rank::Rank;
use crate::model::taxon::{SynonymIndex, TaxonIndex};
use crate::model::taxonomy::Taxonomy;
use std::collections::HashMap;

/// One taxon row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonRow {
    pub id: String,
    /// `None` (or an empty string) marks a root.
    pub parent_id: Option<String>,
    pub name: Option<String>,
    /// Rank name; empty for "no rank".
    pub rank: String,
    /// Encoded flags, see [parse_flags].
    pub flags: String,
    /// Comma-separated `prefix:id` source references.
    pub source_info: String,
    /// The row's own reference in its source, listed first among the sources.
    pub source_id: Option<QualifiedId>,
}

impl TaxonRow {
    pub fn new(id: impl Into<String>, parent_id: Option<&str>, name: &str) -> Self {
        TaxonRow {
            id: id.into(),
            parent_id: parent_id.map(str::to_string),
            name: Some(name.to_string()),
            ..TaxonRow::default()
        }
    }

    pub fn with_rank(mut self, rank: &str) -> Self {
        self.rank = rank.to_string();
        self
    }

    pub fn with_flags(mut self, flags: &str) -> Self {
        self.flags = flags.to_string();
        self
    }

    pub fn with_source_info(mut self, source_info: &str) -> Self {
        self.source_info = source_info.to_string();
        self
    }
}

/// One synonym row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymRow {
    pub owner_id: String,
    pub name: String,
    /// Synonym type; empty means "synonym".
    pub kind: String,
    pub source_info: String,
    pub id: Option<String>,
}

/// Summary of a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Taxon rows loaded.
    pub rows: usize,
    /// Rows of any file that were skipped.
    pub skipped: usize,
    /// Defaulted or ignored fields.
    pub warnings: Vec<LoadError>,
    pub synonyms: usize,
    /// Synonyms of a type that does not name the taxon.
    pub dropped_synonyms: usize,
    /// Synonyms whose owner id names no taxon.
    pub lost_synonyms: usize,
    pub forwards: usize,
    /// Ids of placeholders that never got a row and became roots.
    pub promoted_roots: Vec<String>,
}

/// Incremental taxonomy builder.
#[derive(Debug)]
pub struct Loader {
    taxonomy: Taxonomy,
    placeholders: HashMap<String, TaxonIndex>,
    report: LoadReport,
}

impl Loader {
    /// Loads into `taxonomy` (usually empty, with the configuration to use).
    pub fn new(taxonomy: Taxonomy) -> Self {
        Loader {
            taxonomy,
            placeholders: HashMap::new(),
            report: LoadReport::default(),
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Adds a taxon row.
    ///
    /// # Errors
    /// * [LoadErrorKind::MissingId] - the row has an empty id
    /// * [LoadErrorKind::Redefined] - the id already had a row
    /// * [LoadErrorKind::Structure] - attaching would create a cycle
    ///
    /// On error the row is not loaded; a placeholder it would have filled stays.
    pub fn add_taxon(&mut self, row: &TaxonRow) -> Result<TaxonIndex, LoadError> {
        if row.id.trim().is_empty() {
            return Err(LoadError::new(LoadErrorKind::MissingId));
        }
        let parent_id = row.parent_id.as_deref().filter(|p| !p.is_empty());
        let (node, was_placeholder) = match self.placeholders.get(&row.id) {
            Some(placeholder) => (*placeholder, true),
            None if self.taxonomy.lookup_id(&row.id).is_some() => {
                return Err(LoadError::new(LoadErrorKind::Redefined(row.id.clone())));
            }
            None => {
                let node = self.taxonomy.new_taxon(row.name.as_deref());
                self.taxonomy.bind_id(node, &row.id)?;
                (node, false)
            }
        };

        let parent = match parent_id {
            Some(parent_id) => Some(self.taxon_or_placeholder(parent_id)?),
            None => None,
        };
        // Named before attaching, as root placement depends on the name
        if was_placeholder {
            self.taxonomy.rename(node, row.name.as_deref())?;
        }
        let attached = match parent {
            Some(parent) => self.taxonomy.attach(parent, node).map(|_| ()),
            None => self.taxonomy.add_root(node),
        };
        if let Err(err) = attached {
            if was_placeholder {
                self.taxonomy.rename(node, None)?;
            } else {
                self.taxonomy.prune(node, "rejected row")?;
            }
            return Err(err.into());
        }

        if was_placeholder {
            self.placeholders.remove(&row.id);
        }
        self.fill_fields(node, row)?;
        self.report.rows += 1;
        Ok(node)
    }

    /// Adds a synonym row.
    ///
    /// # Returns
    /// `None` if the synonym type is one that is dropped.
    ///
    /// # Errors
    /// [LoadErrorKind::UnknownOwner] if the owner id names no taxon; counted as lost.
    pub fn add_synonym(&mut self, row: &SynonymRow) -> Result<Option<SynonymIndex>, LoadError> {
        let kind = if row.kind.is_empty() { DEFAULT_SYNONYM_TYPE } else { row.kind.as_str() };
        if DROPPED_SYNONYM_TYPES.contains(&kind) {
            self.report.dropped_synonyms += 1;
            return Ok(None);
        }
        let Some(owner) = self.taxonomy.lookup_id(&row.owner_id) else {
            self.report.lost_synonyms += 1;
            return Err(LoadError::new(LoadErrorKind::UnknownOwner(row.owner_id.clone())));
        };

        let sources = self.parse_sources(&row.source_info);
        let synonym = self.taxonomy.new_synonym(owner, &row.name, kind, sources)?;
        if let Some(id) = &row.id {
            self.taxonomy.set_synonym_id(synonym, id);
        }
        self.report.synonyms += 1;
        Ok(Some(synonym))
    }

    /// Adds a forward: `alias` becomes another id of the taxon with id `canonical`.
    pub fn add_forward(&mut self, alias: &str, canonical: &str) -> Result<(), LoadError> {
        let Some(target) = self.taxonomy.lookup_id(canonical) else {
            return Err(LoadError::new(LoadErrorKind::UnknownOwner(canonical.to_string())));
        };
        self.taxonomy.add_alias(alias, target)?;
        self.report.forwards += 1;
        Ok(())
    }

    /// Counts a skipped row and logs why.
    pub fn skip(&mut self, err: LoadError) {
        tracing::warn!(line = err.line(), "skipping row: {err}");
        self.report.skipped += 1;
    }

    /// Ends the load: placeholders that never got a row become roots named
    /// "missing parent <id>".
    pub fn finish(mut self) -> (Taxonomy, LoadReport) {
        let mut orphans: Vec<(String, TaxonIndex)> = self.placeholders.drain().collect();
        orphans.sort();
        for (id, node) in orphans {
            tracing::warn!(id, "parent id never defined, promoting to root");
            let name = format!("missing parent {id}");
            let promoted = self
                .taxonomy
                .rename(node, Some(&name))
                .and_then(|()| self.taxonomy.add_root(node));
            match promoted {
                Ok(()) => self.report.promoted_roots.push(id),
                Err(err) => tracing::error!(id, %err, "cannot promote placeholder"),
            }
        }
        tracing::debug!(
            taxonomy = %self.taxonomy.name(),
            rows = self.report.rows,
            skipped = self.report.skipped,
            "load finished"
        );
        (self.taxonomy, self.report)
    }

    fn taxon_or_placeholder(&mut self, id: &str) -> Result<TaxonIndex, LoadError> {
        if let Some(existing) = self.taxonomy.lookup_id(id) {
            return Ok(existing);
        }
        let placeholder = self.taxonomy.new_taxon(None);
        self.taxonomy.bind_id(placeholder, id)?;
        self.placeholders.insert(id.to_string(), placeholder);
        Ok(placeholder)
    }

    fn fill_fields(&mut self, node: TaxonIndex, row: &TaxonRow) -> Result<(), LoadError> {
        let rank = match Rank::from_name(&row.rank) {
            Some(rank) => rank,
            None => {
                self.warn(LoadErrorKind::UnknownRank(row.rank.clone()), &row.id);
                Rank::NoRank
            }
        };
        self.taxonomy.set_rank(node, rank)?;

        let parsed = parse_flags(&row.flags);
        for token in parsed.unknown {
            self.warn(LoadErrorKind::UnknownFlag(token), &row.id);
        }
        {
            let taxon = self.taxonomy.node_mut(node);
            taxon.proper |= parsed.proper;
            taxon.inferred |= parsed.inferred;
        }

        if let Some(source) = &row.source_id {
            self.taxonomy.add_source(node, source.clone())?;
        }
        for source in self.parse_sources(&row.source_info) {
            self.taxonomy.add_source(node, source)?;
        }
        Ok(())
    }

    fn parse_sources(&mut self, source_info: &str) -> Vec<QualifiedId> {
        let (sources, bad) = QualifiedId::parse_list(source_info);
        for token in bad {
            self.warn(LoadErrorKind::BadQualifiedId(token), source_info);
        }
        sources
    }

    fn warn(&mut self, kind: LoadErrorKind, context: &str) {
        let warning = LoadError::new(kind).at_line(0, context);
        tracing::warn!("{warning}");
        self.report.warnings.push(warning);
    }
}
