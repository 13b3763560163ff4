//! Tree engine: the taxonomy arena, its indices and all structural mutations.
//!
//! [Taxonomy] owns the taxon and synonym arenas together with the
//! [Registry] (name and id indices). Every operation that changes a name, an
//! id or a parent link goes through it, so the indices never disagree with
//! the tree.
//!
//! # Structure
//! - Slot 0 holds the synthetic *forest*; the roots of the taxonomy are its children
//! - A taxon with `parent == None` is *detached* (distinct from being a root)
//! - Pruned taxa are tombstones: removed from both indices and detached, but
//!   still readable through their handles
//!
//! # Caches
//! Subtree counts, depths and divisions are computed lazily and cached on the
//! taxa. Structural changes invalidate counts up the ancestor chain and depths
//! and divisions down the moved subtree.

use crate::config::{ContainerRedirect, TaxonomyConfig};
use crate::error::TaxonomyError;
use crate::event_log::{Event, EventLog, Verdict};
use crate::model::flags::Flags;
use crate::model::qualified_id::QualifiedId;
use crate::model::rank::Rank;
use crate::model::registry::Registry;
use crate::model::taxon::{
    Entity, FOREST_SLOT, Synonym, SynonymIndex, Taxon, TaxonIndex, TaxonomyTag,
};
use std::collections::HashSet;

/// Synonym type recorded when an only child is elided into its parent.
pub const SUBSUMED_BY: &str = "subsumed_by";

/// Synonym type recorded for names of absorbed taxa.
pub const SYNONYM: &str = "synonym";

// =#========================================================================#=
// TAXONOMY
// =#========================================================================#=
/// A forest of taxa with name and id indices.
///
/// # Example
/// ```
/// use taxotree::model::taxonomy::Taxonomy;
/// use taxotree::model::rank::Rank;
///
/// let mut tax = Taxonomy::new("demo");
/// let life = tax.new_taxon(Some("life"));
/// tax.add_root(life).unwrap();
/// let bacteria = tax.new_taxon(Some("Bacteria"));
/// tax.attach(life, bacteria).unwrap();
/// tax.set_rank(bacteria, Rank::Domain).unwrap();
/// tax.bind_id(bacteria, "2").unwrap();
///
/// assert_eq!(tax.lookup_id("2"), Some(bacteria));
/// assert_eq!(tax.count(life), 2);
/// assert!(tax.is_valid());
/// ```
#[derive(Debug)]
pub struct Taxonomy {
    tag: TaxonomyTag,
    name: String,
    pub(crate) nodes: Vec<Taxon>,
    pub(crate) synonyms: Vec<Synonym>,
    pub(crate) registry: Registry,
    pub(crate) config: TaxonomyConfig,
    pub(crate) log: EventLog,
}

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl Taxonomy {
    /// Creates an empty taxonomy holding only the forest.
    ///
    /// # Arguments
    /// * `name` - Name of the taxonomy, e.g. the source prefix "ncbi"
    pub fn new(name: impl Into<String>) -> Self {
        let tag = TaxonomyTag::fresh();
        let config = TaxonomyConfig::default();
        let log = EventLog::new(config.interest.clone());
        Taxonomy {
            tag,
            name: name.into(),
            nodes: vec![Taxon::new(TaxonIndex::new(tag, FOREST_SLOT), None)],
            synonyms: Vec::new(),
            registry: Registry::new(),
            config,
            log,
        }
    }

    /// Replaces the configuration; also resets the event log's interest predicates.
    pub fn with_config(mut self, config: TaxonomyConfig) -> Self {
        self.log = EventLog::new(config.interest.clone());
        self.config = config;
        self
    }

    /// Replaces the event log.
    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    pub fn tag(&self) -> TaxonomyTag {
        self.tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &TaxonomyConfig {
        &self.config
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Takes the event log, leaving an empty one with the same interest.
    pub fn take_event_log(&mut self) -> EventLog {
        let fresh = EventLog::new(self.log.interest().clone());
        std::mem::replace(&mut self.log, fresh)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the handle of the synthetic forest root.
    pub fn forest(&self) -> TaxonIndex {
        TaxonIndex::new(self.tag, FOREST_SLOT)
    }

    /// Returns whether `index` belongs to this taxonomy.
    pub fn contains(&self, index: TaxonIndex) -> bool {
        index.taxonomy() == self.tag && index.slot() < self.nodes.len()
    }

    /// Returns the taxon for `index`, or `None` for a foreign handle.
    pub fn get(&self, index: TaxonIndex) -> Option<&Taxon> {
        self.contains(index).then(|| &self.nodes[index.slot()])
    }

    /// Returns the synonym for `index`.
    ///
    /// # Panics
    /// Panics if `index` belongs to another taxonomy.
    pub fn synonym(&self, index: SynonymIndex) -> &Synonym {
        assert_eq!(index.taxonomy(), self.tag, "synonym handle from another taxonomy");
        &self.synonyms[index.slot()]
    }

    /// Iterates over all live synonyms.
    pub fn synonyms(&self) -> impl Iterator<Item = &Synonym> + '_ {
        self.synonyms.iter().filter(|s| s.live)
    }

    /// Iterates over all live taxa (the forest excluded), in creation order.
    pub fn taxa(&self) -> impl Iterator<Item = &Taxon> + '_ {
        self.nodes.iter().filter(|t| !t.pruned && !t.is_forest())
    }

    /// Returns the number of live taxa (the forest excluded).
    pub fn num_taxa(&self) -> usize {
        self.taxa().count()
    }

    /// Returns the roots, i.e. the children of the forest.
    pub fn roots(&self) -> Vec<TaxonIndex> {
        self.nodes[FOREST_SLOT].children.clone()
    }

    /// Returns all entities registered under `name`.
    pub fn lookup_name(&self, name: &str) -> Vec<Entity> {
        self.registry.lookup_name(name).collect()
    }

    /// Returns the taxa carrying `name` as their own name.
    pub fn taxa_named(&self, name: &str) -> Vec<TaxonIndex> {
        self.registry
            .lookup_name(name)
            .filter_map(|e| match e {
                Entity::Taxon(t) => Some(t),
                Entity::Synonym(_) => None,
            })
            .collect()
    }

    /// Returns the taxa carrying `name` either as their name or as a synonym,
    /// without duplicates, in index order.
    pub fn bearers(&self, name: &str) -> Vec<TaxonIndex> {
        let mut seen = HashSet::new();
        let mut bearers: Vec<TaxonIndex> = self
            .registry
            .lookup_name(name)
            .map(|e| match e {
                Entity::Taxon(t) => t,
                Entity::Synonym(s) => self.synonyms[s.slot()].owner,
            })
            .filter(|t| seen.insert(*t))
            .collect();
        bearers.sort();
        bearers
    }

    /// Returns the live taxon bound to `id` (its primary id or an alias).
    pub fn lookup_id(&self, id: &str) -> Option<TaxonIndex> {
        self.registry
            .lookup_id(id)
            .filter(|t| !self.nodes[t.slot()].pruned)
    }

    /// Iterates over the proper ancestors of `node`, nearest first (forest included).
    pub fn ancestors(&self, node: TaxonIndex) -> Ancestors<'_> {
        Ancestors {
            taxonomy: self,
            next: self[node].parent,
        }
    }

    /// Returns whether `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: TaxonIndex, node: TaxonIndex) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }
}

impl std::ops::Index<TaxonIndex> for Taxonomy {
    type Output = Taxon;

    /// # Panics
    /// Panics if `index` belongs to another taxonomy.
    fn index(&self, index: TaxonIndex) -> &Self::Output {
        assert_eq!(index.taxonomy(), self.tag, "{index} used with another taxonomy");
        &self.nodes[index.slot()]
    }
}

// ============================================================================
// Entities, names and ids (pub)
// ============================================================================
impl Taxonomy {
    /// Creates a detached taxon, registering it under its name if it has one.
    pub fn new_taxon(&mut self, name: Option<&str>) -> TaxonIndex {
        let index = TaxonIndex::new(self.tag, self.nodes.len());
        self.nodes.push(Taxon::new(index, name.map(str::to_string)));
        if let Some(name) = name {
            self.registry.register(name, Entity::Taxon(index));
        }
        index
    }

    /// Adds a synonym to `owner`; an existing synonym with the same name and
    /// type is returned instead of creating a duplicate.
    pub fn new_synonym(
        &mut self,
        owner: TaxonIndex,
        name: &str,
        kind: &str,
        sources: Vec<QualifiedId>,
    ) -> Result<SynonymIndex, TaxonomyError> {
        self.check_live(owner)?;
        if let Some(existing) = self.nodes[owner.slot()]
            .synonyms
            .iter()
            .copied()
            .find(|s| self.synonyms[s.slot()].name == name && self.synonyms[s.slot()].kind == kind)
        {
            return Ok(existing);
        }

        let index = SynonymIndex::new(self.tag, self.synonyms.len());
        self.synonyms.push(Synonym {
            index,
            name: name.to_string(),
            owner,
            kind: kind.to_string(),
            sources,
            id: None,
            live: true,
        });
        self.nodes[owner.slot()].synonyms.push(index);
        self.registry.register(name, Entity::Synonym(index));
        Ok(index)
    }

    /// Records the source's own id of a synonym.
    pub fn set_synonym_id(&mut self, synonym: SynonymIndex, id: &str) {
        assert_eq!(synonym.taxonomy(), self.tag, "synonym handle from another taxonomy");
        self.synonyms[synonym.slot()].id = Some(id.to_string());
    }

    /// Renames a taxon; the name index is updated in the same step.
    pub fn rename(&mut self, node: TaxonIndex, name: Option<&str>) -> Result<(), TaxonomyError> {
        self.check_live(node)?;
        let taxon = &mut self.nodes[node.slot()];
        if taxon.name.as_deref() == name {
            return Ok(());
        }
        if let Some(old) = taxon.name.take() {
            self.registry.unregister(&old, Entity::Taxon(node));
        }
        if let Some(name) = name {
            self.nodes[node.slot()].name = Some(name.to_string());
            self.registry.register(name, Entity::Taxon(node));
        }
        Ok(())
    }

    /// Binds the external id of a taxon, replacing its previous id.
    ///
    /// # Errors
    /// [TaxonomyError::IdCollision] if `id` is bound to another live taxon;
    /// the existing binding is kept.
    pub fn bind_id(&mut self, node: TaxonIndex, id: &str) -> Result<(), TaxonomyError> {
        self.check_live(node)?;
        if self.nodes[node.slot()].id.as_deref() == Some(id) {
            return Ok(());
        }
        self.check_id_free(node, id)?;

        if let Some(old) = self.nodes[node.slot()].id.take() {
            self.registry.unbind(&old, node);
        }
        self.registry.bind(id, node);
        self.nodes[node.slot()].id = Some(id.to_string());
        Ok(())
    }

    /// Removes the external id of a taxon, returning it.
    pub fn clear_id(&mut self, node: TaxonIndex) -> Result<Option<String>, TaxonomyError> {
        self.check_live(node)?;
        let old = self.nodes[node.slot()].id.take();
        if let Some(old) = &old {
            self.registry.unbind(old, node);
        }
        Ok(old)
    }

    /// Adds `alias` as an additional id under which `node` can be looked up.
    pub fn add_alias(&mut self, alias: &str, node: TaxonIndex) -> Result<(), TaxonomyError> {
        self.check_live(node)?;
        if self.registry.lookup_id(alias) == Some(node) {
            return Ok(());
        }
        self.check_id_free(node, alias)?;
        self.registry.bind(alias, node);
        Ok(())
    }

    pub fn set_rank(&mut self, node: TaxonIndex, rank: Rank) -> Result<(), TaxonomyError> {
        self.check_live(node)?;
        self.nodes[node.slot()].rank = rank;
        Ok(())
    }

    /// Adds a qualified source reference unless already present.
    pub fn add_source(&mut self, node: TaxonIndex, source: QualifiedId) -> Result<(), TaxonomyError> {
        self.check_live(node)?;
        let sources = &mut self.nodes[node.slot()].sources;
        if !sources.contains(&source) {
            sources.push(source);
        }
        Ok(())
    }

    /// Adds proper flags. Derived flags cannot be set this way and are ignored.
    pub fn add_flags(&mut self, node: TaxonIndex, flags: Flags) -> Result<(), TaxonomyError> {
        self.check_live(node)?;
        if flags.intersects(Flags::DERIVED) {
            tracing::warn!(%node, ?flags, "derived flags can only be set by classification");
        }
        self.nodes[node.slot()].proper |= flags - Flags::DERIVED;
        Ok(())
    }

    /// Removes proper flags.
    pub fn remove_flags(&mut self, node: TaxonIndex, flags: Flags) -> Result<(), TaxonomyError> {
        self.check_live(node)?;
        self.nodes[node.slot()].proper.remove(flags);
        Ok(())
    }

    /// Marks `node` as a division, the lineage used to tell homonyms apart.
    pub fn mark_division(&mut self, node: TaxonIndex) -> Result<(), TaxonomyError> {
        self.check_live(node)?;
        self.nodes[node.slot()].is_division = true;
        self.clear_division_cache();
        Ok(())
    }
}

// ============================================================================
// Structural mutation (pub)
// ============================================================================
impl Taxonomy {
    /// Attaches a detached `child` under `parent`.
    ///
    /// If `parent` is an emptied container, the child goes to the container's
    /// redirect target instead (see [ContainerRedirect]) and is flagged unplaced.
    ///
    /// # Returns
    /// The parent the child was actually attached to.
    ///
    /// # Errors
    /// * [TaxonomyError::ForeignTaxonomy] - a handle belongs to another taxonomy
    /// * [TaxonomyError::PrunedTaxon] - a handle refers to a pruned taxon
    /// * [TaxonomyError::Cycle] - `parent` is `child` or descends from it
    /// * [TaxonomyError::AlreadyAttached] - `child` has a parent
    pub fn attach(&mut self, parent: TaxonIndex, child: TaxonIndex) -> Result<TaxonIndex, TaxonomyError> {
        self.place(parent, child, None, true)
    }

    /// Like [Taxonomy::attach], additionally clearing the incertae-sedis
    /// family of flags on `child` and adding `flags` to it.
    pub fn attach_with_flags(
        &mut self,
        parent: TaxonIndex,
        child: TaxonIndex,
        flags: Flags,
    ) -> Result<TaxonIndex, TaxonomyError> {
        self.place(parent, child, Some(flags), true)
    }

    /// Detaches `child` from its parent; a no-op for detached (and pruned) taxa.
    pub fn detach(&mut self, child: TaxonIndex) -> Result<(), TaxonomyError> {
        self.check_member(child)?;
        if let Some(parent) = self.nodes[child.slot()].parent {
            self.unlink(parent, child);
        }
        Ok(())
    }

    /// Moves `child` under `new_parent`. On error the tree is unchanged.
    pub fn reparent(&mut self, child: TaxonIndex, new_parent: TaxonIndex) -> Result<TaxonIndex, TaxonomyError> {
        self.place(new_parent, child, None, false)
    }

    /// Moves `child` under `new_parent`, clearing its incertae-sedis family of
    /// flags and adding `flags`.
    pub fn reparent_with_flags(
        &mut self,
        child: TaxonIndex,
        new_parent: TaxonIndex,
        flags: Flags,
    ) -> Result<TaxonIndex, TaxonomyError> {
        self.place(new_parent, child, Some(flags), false)
    }

    /// Prunes `node` and its whole subtree.
    ///
    /// Pruned taxa are detached, removed from both indices and marked as
    /// tombstones; one decision per pruned taxon is recorded in the event log.
    /// Pruning the forest prunes every root. Idempotent.
    ///
    /// # Returns
    /// The number of taxa pruned by this call.
    pub fn prune(&mut self, node: TaxonIndex, reason: &str) -> Result<usize, TaxonomyError> {
        self.check_member(node)?;
        if node == self.forest() {
            let mut total = 0;
            for root in self.roots() {
                total += self.prune(root, reason)?;
            }
            return Ok(total);
        }
        if self.nodes[node.slot()].pruned {
            return Ok(0);
        }

        let size = self.count(node);
        self.record(node, "prune", size, Verdict::NoInformation, reason.to_string());
        self.detach(node)?;

        let doomed: Vec<TaxonIndex> = self.pre_order(node).collect();
        for &index in &doomed {
            self.tombstone(index);
            if index != node {
                self.record(index, "prune", 1, Verdict::NoInformation, format!("descendant, {reason}"));
            }
        }
        Ok(doomed.len())
    }

    /// Elides `node`: its children move to its parent, then it is pruned.
    ///
    /// # Arguments
    /// * `node` - Taxon to remove
    /// * `placed` - If `false`, the moved children are flagged unplaced
    ///
    /// If `node` was an only child, its name is kept as a [SUBSUMED_BY]
    /// synonym of the parent.
    pub fn elide(&mut self, node: TaxonIndex, placed: bool) -> Result<(), TaxonomyError> {
        self.check_live(node)?;
        let Some(parent) = self.nodes[node.slot()].parent else {
            return Err(TaxonomyError::Detached(node));
        };
        let only_child = self.nodes[parent.slot()].children.len() == 1;

        for child in self.nodes[node.slot()].children.clone() {
            self.reparent(child, parent)?;
            if !placed {
                self.nodes[child.slot()].proper |= Flags::UNPLACED;
            }
        }

        if only_child && parent != self.forest() {
            if let Some(name) = self.nodes[node.slot()].name.clone() {
                if self.nodes[parent.slot()].name.as_deref() != Some(name.as_str()) {
                    let sources = self.nodes[node.slot()].sources.clone();
                    self.new_synonym(parent, &name, SUBSUMED_BY, sources)?;
                }
            }
        }
        self.prune(node, "elided")?;
        Ok(())
    }

    /// Merges `other` into `target`.
    ///
    /// Children and synonyms of `other` move to `target`, the name of `other`
    /// becomes a synonym of `target`, its sources are merged, and its id becomes
    /// an alias of `target`. Then `other` is pruned.
    pub fn absorb(&mut self, target: TaxonIndex, other: TaxonIndex) -> Result<(), TaxonomyError> {
        self.check_live(target)?;
        self.check_live(other)?;
        if target == other {
            return Ok(());
        }
        if self.is_ancestor_or_self(other, target) {
            return Err(TaxonomyError::Cycle { parent: target, child: other });
        }

        let size = self.count(other);
        for child in self.nodes[other.slot()].children.clone() {
            self.reparent(child, target)?;
        }

        for synonym in std::mem::take(&mut self.nodes[other.slot()].synonyms) {
            let (name, kind) = {
                let s = &self.synonyms[synonym.slot()];
                (s.name.clone(), s.kind.clone())
            };
            let duplicate = self.nodes[target.slot()].synonyms.iter().any(|s| {
                let s = &self.synonyms[s.slot()];
                s.name == name && s.kind == kind
            });
            if duplicate || self.nodes[target.slot()].name.as_deref() == Some(name.as_str()) {
                self.kill_synonym(synonym);
            } else {
                self.synonyms[synonym.slot()].owner = target;
                self.nodes[target.slot()].synonyms.push(synonym);
            }
        }

        let other_taxon = &self.nodes[other.slot()];
        let other_name = other_taxon.name.clone();
        let other_id = other_taxon.id.clone();
        let other_sources = other_taxon.sources.clone();
        if let Some(name) = &other_name {
            if self.nodes[target.slot()].name.as_deref() != Some(name.as_str()) {
                self.new_synonym(target, name, SYNONYM, other_sources.clone())?;
            }
        }
        for source in other_sources {
            self.add_source(target, source)?;
        }

        self.record(
            other,
            "absorb",
            size,
            Verdict::Interesting,
            format!("absorbed into {}", self.nodes[target.slot()].display_name()),
        );
        self.prune(other, "absorbed")?;

        if let Some(id) = other_id {
            if self.lookup_id(&id).is_none() {
                self.registry.bind(&id, target);
            }
        }
        Ok(())
    }

    /// Makes `node` a root: attaches it under the forest and flags it unplaced
    /// unless its name is the configured top name.
    pub fn add_root(&mut self, node: TaxonIndex) -> Result<(), TaxonomyError> {
        self.check_live(node)?;
        let forest = self.forest();
        if self.nodes[node.slot()].parent != Some(forest) {
            self.attach(forest, node)?;
        }
        if self.nodes[node.slot()].name.as_deref() != Some(self.config.top_name.as_str()) {
            self.nodes[node.slot()].proper |= Flags::UNPLACED;
        }
        Ok(())
    }
}

// ============================================================================
// Structural mutation (private)
// ============================================================================
impl Taxonomy {
    /// Shared implementation of attach and reparent.
    fn place(
        &mut self,
        parent: TaxonIndex,
        child: TaxonIndex,
        flags: Option<Flags>,
        require_detached: bool,
    ) -> Result<TaxonIndex, TaxonomyError> {
        self.check_live(parent)?;
        self.check_live(child)?;
        let (target, redirected) = self.redirect_target(parent);

        // The forest owns every root and never has a parent
        if child == self.forest() || target == child || self.is_ancestor_or_self(child, target) {
            return Err(TaxonomyError::Cycle { parent: target, child });
        }
        let old_parent = self.nodes[child.slot()].parent;
        if require_detached {
            if let Some(old_parent) = old_parent {
                return Err(TaxonomyError::AlreadyAttached { child, parent: old_parent });
            }
        }

        if old_parent != Some(target) {
            if let Some(old_parent) = old_parent {
                self.unlink(old_parent, child);
            }
            self.link(target, child);
        }

        let container = redirected.then(|| self.nodes[parent.slot()].display_name().to_string());
        let taxon = &mut self.nodes[child.slot()];
        if let Some(flags) = flags {
            taxon.proper.remove(Flags::INCERTAE_SEDIS_ANY);
            taxon.proper |= flags - Flags::DERIVED;
        }
        if let Some(container) = container {
            taxon.proper |= Flags::UNPLACED;
            let detail = format!("redirected from emptied container {container}");
            self.record(child, "container-redirect", 1, Verdict::Interesting, detail);
        }
        Ok(target)
    }

    /// Resolves where a child attached to `parent` actually goes.
    fn redirect_target(&self, parent: TaxonIndex) -> (TaxonIndex, bool) {
        let forest = self.forest();
        let mut target = parent;
        let mut redirected = false;
        // Each step moves strictly upward, so this terminates at the forest at the latest.
        while target != forest && self.nodes[target.slot()].is_former_container() {
            let container = &self.nodes[target.slot()];
            let next = match self.config.container_redirect {
                ContainerRedirect::DivisionThenParent => self
                    .division(target)
                    .filter(|d| *d != target)
                    .or(container.parent),
                ContainerRedirect::ParentOnly => container.parent,
            };
            target = next.unwrap_or(forest);
            redirected = true;
        }
        (target, redirected)
    }

    fn link(&mut self, parent: TaxonIndex, child: TaxonIndex) {
        self.nodes[child.slot()].parent = Some(parent);
        self.nodes[parent.slot()].children.push(child);
        self.invalidate_count_upward(parent);
        self.invalidate_downward(child);
    }

    fn unlink(&mut self, parent: TaxonIndex, child: TaxonIndex) {
        let siblings = &mut self.nodes[parent.slot()].children;
        match siblings.iter().position(|c| *c == child) {
            Some(position) => {
                siblings.remove(position);
            }
            None => {
                tracing::error!(%child, %parent, "child missing from its parent's child list");
            }
        }
        self.nodes[child.slot()].parent = None;
        self.invalidate_count_upward(parent);
        self.invalidate_downward(child);
    }

    /// Marks a taxon pruned and removes it (and its synonyms) from the indices.
    fn tombstone(&mut self, node: TaxonIndex) {
        let taxon = &mut self.nodes[node.slot()];
        taxon.pruned = true;
        let name = taxon.name.clone();
        let id = taxon.id.clone();
        let synonyms = taxon.synonyms.clone();

        if let Some(name) = name {
            self.registry.unregister(&name, Entity::Taxon(node));
        }
        if let Some(id) = id {
            self.registry.unbind(&id, node);
        }
        for synonym in synonyms {
            self.kill_synonym(synonym);
        }
    }

    fn kill_synonym(&mut self, synonym: SynonymIndex) {
        let s = &mut self.synonyms[synonym.slot()];
        if s.live {
            s.live = false;
            let name = s.name.clone();
            self.registry.unregister(&name, Entity::Synonym(synonym));
        }
    }

    pub(crate) fn check_member(&self, node: TaxonIndex) -> Result<(), TaxonomyError> {
        if self.contains(node) {
            Ok(())
        } else {
            Err(TaxonomyError::ForeignTaxonomy(node))
        }
    }

    pub(crate) fn check_live(&self, node: TaxonIndex) -> Result<(), TaxonomyError> {
        self.check_member(node)?;
        if self.nodes[node.slot()].pruned {
            return Err(TaxonomyError::PrunedTaxon(node));
        }
        Ok(())
    }

    fn check_id_free(&mut self, node: TaxonIndex, id: &str) -> Result<(), TaxonomyError> {
        match self.lookup_id(id) {
            Some(existing) if existing != node => {
                tracing::warn!(id, %existing, requested = %node, "id already bound to a live taxon");
                self.record(
                    node,
                    "id-collision",
                    1,
                    Verdict::Warning,
                    format!("id {id} already bound to {}", self.nodes[existing.slot()].display_name()),
                );
                Err(TaxonomyError::IdCollision {
                    id: id.to_string(),
                    existing,
                })
            }
            _ => Ok(()),
        }
    }

    /// Records an event about `node` in the event log.
    pub(crate) fn record(&mut self, node: TaxonIndex, kind: &str, size: usize, verdict: Verdict, detail: String) {
        let taxon = &self.nodes[node.slot()];
        let event = Event {
            kind: kind.to_string(),
            name: taxon.name.clone(),
            id: taxon.id.clone(),
            size,
            verdict,
            detail,
        };
        self.log.record(event);
    }

    pub(crate) fn node_mut(&mut self, node: TaxonIndex) -> &mut Taxon {
        assert_eq!(node.taxonomy(), self.tag, "{node} used with another taxonomy");
        &mut self.nodes[node.slot()]
    }
}

// ============================================================================
// Cached values
// ============================================================================
impl Taxonomy {
    /// Returns the number of taxa in the subtree of `node`, itself included.
    pub fn count(&self, node: TaxonIndex) -> usize {
        if let Some(count) = self[node].count.get() {
            return count;
        }
        let mut stack = vec![(node, false)];
        while let Some((index, children_done)) = stack.pop() {
            let taxon = &self.nodes[index.slot()];
            if taxon.count.get().is_some() {
                continue;
            }
            if children_done {
                let total = 1 + taxon
                    .children
                    .iter()
                    .map(|c| self.nodes[c.slot()].count.get().unwrap_or(0))
                    .sum::<usize>();
                taxon.count.set(Some(total));
            } else {
                stack.push((index, true));
                for child in &taxon.children {
                    if self.nodes[child.slot()].count.get().is_none() {
                        stack.push((*child, false));
                    }
                }
            }
        }
        self[node].count.get().unwrap_or(1)
    }

    /// Returns the number of parent links between `node` and the top of its tree
    /// (the forest has depth 0, roots depth 1, a detached taxon depth 0).
    pub fn depth(&self, node: TaxonIndex) -> usize {
        let mut chain = Vec::new();
        let mut current = node;
        let mut above = loop {
            let taxon = &self[current];
            if let Some(depth) = taxon.depth.get() {
                break Some(depth);
            }
            chain.push(current);
            match taxon.parent {
                Some(parent) => current = parent,
                None => break None,
            }
        };
        for index in chain.into_iter().rev() {
            let depth = above.map_or(0, |d| d + 1);
            self.nodes[index.slot()].depth.set(Some(depth));
            above = Some(depth);
        }
        above.unwrap_or(0)
    }

    /// Depth computed by walking the parent chain, ignoring caches.
    pub fn uncached_depth(&self, node: TaxonIndex) -> usize {
        self.ancestors(node).count()
    }

    /// Returns the nearest division at or above `node`.
    pub fn division(&self, node: TaxonIndex) -> Option<TaxonIndex> {
        let mut chain = Vec::new();
        let mut current = Some(node);
        let division = loop {
            let Some(index) = current else { break None };
            let taxon = &self[index];
            if let Some(cached) = taxon.division.get() {
                break cached;
            }
            chain.push(index);
            if taxon.is_division {
                break Some(index);
            }
            current = taxon.parent;
        };
        for index in chain {
            self.nodes[index.slot()].division.set(Some(division));
        }
        division
    }

    /// Forgets all cached divisions.
    pub fn clear_division_cache(&mut self) {
        for taxon in &self.nodes {
            taxon.division.set(None);
        }
    }

    /// Forgets all cached counts, depths and divisions.
    pub fn reset_caches(&mut self) {
        for taxon in &self.nodes {
            taxon.count.set(None);
            taxon.depth.set(None);
            taxon.division.set(None);
        }
    }

    /// An uncached count implies uncached ancestors, so the walk stops at the
    /// first ancestor already invalidated.
    fn invalidate_count_upward(&self, from: TaxonIndex) {
        let mut current = Some(from);
        while let Some(index) = current {
            let taxon = &self.nodes[index.slot()];
            if taxon.count.get().is_none() {
                break;
            }
            taxon.count.set(None);
            current = taxon.parent;
        }
    }

    /// Depths and divisions of a moved subtree become stale. A taxon with
    /// neither cached has no cached descendants that depend on it.
    fn invalidate_downward(&self, from: TaxonIndex) {
        let mut stack = vec![from];
        while let Some(index) = stack.pop() {
            let taxon = &self.nodes[index.slot()];
            if taxon.depth.get().is_none() && taxon.division.get().is_none() {
                continue;
            }
            taxon.depth.set(None);
            taxon.division.set(None);
            stack.extend(taxon.children.iter().copied());
        }
    }
}

// ============================================================================
// Validation
// ============================================================================
impl Taxonomy {
    /// Checks every structural and index invariant, returning the violations found.
    ///
    /// Checks:
    /// - every handle is stored at its own slot
    /// - parent and child links agree, and no taxon is its own ancestor
    /// - live taxa are registered under their name and id; pruned ones are not
    /// - cached counts and depths equal freshly computed values
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.nodes[FOREST_SLOT].parent.is_some() {
            problems.push("forest has a parent".to_string());
        }

        for (slot, taxon) in self.nodes.iter().enumerate() {
            let index = taxon.index;
            if index.slot() != slot || index.taxonomy() != self.tag {
                problems.push(format!("{index} stored at slot {slot}"));
                continue;
            }

            for child in &taxon.children {
                if self.nodes[child.slot()].parent != Some(index) {
                    problems.push(format!("{child} listed under {index} but points elsewhere"));
                }
            }
            if let Some(parent) = taxon.parent {
                if !self.nodes[parent.slot()].children.contains(&index) {
                    problems.push(format!("{index} missing from the children of {parent}"));
                }
                if !taxon.pruned && self.nodes[parent.slot()].pruned {
                    problems.push(format!("{index} is live under pruned {parent}"));
                }
            }

            let mut steps = 0;
            let mut current = taxon.parent;
            while let Some(ancestor) = current {
                steps += 1;
                if ancestor == index || steps > self.nodes.len() {
                    problems.push(format!("{index} is its own ancestor"));
                    break;
                }
                current = self.nodes[ancestor.slot()].parent;
            }

            let registered = taxon
                .name
                .as_deref()
                .is_some_and(|n| self.registry.lookup_name(n).any(|e| e == Entity::Taxon(index)));
            let id_bound = taxon
                .id
                .as_deref()
                .is_some_and(|id| self.registry.lookup_id(id) == Some(index));
            if taxon.pruned {
                if registered || id_bound {
                    problems.push(format!("pruned {index} still indexed"));
                }
                if taxon.parent.is_some_and(|p| !self.nodes[p.slot()].pruned) {
                    problems.push(format!("pruned {index} still attached"));
                }
            } else {
                if taxon.name.is_some() && !registered {
                    problems.push(format!("{index} not registered under its name"));
                }
                if taxon.id.is_some() && !id_bound {
                    problems.push(format!("{index} not registered under its id"));
                }
            }

            if let Some(count) = taxon.count.get() {
                let fresh = 1 + self.pre_order(index).skip(1).count();
                if count != fresh {
                    problems.push(format!("{index} caches count {count}, actual {fresh}"));
                }
            }
            if let Some(depth) = taxon.depth.get() {
                let fresh = self.uncached_depth(index);
                if depth != fresh {
                    problems.push(format!("{index} caches depth {depth}, actual {fresh}"));
                }
            }
        }

        for synonym in self.synonyms.iter().filter(|s| s.live) {
            if self.nodes[synonym.owner.slot()].pruned {
                problems.push(format!("synonym {} of pruned {}", synonym.name, synonym.owner));
            }
        }
        problems
    }

    /// Returns whether [Taxonomy::validate] finds no violations; logs any it finds.
    pub fn is_valid(&self) -> bool {
        let problems = self.validate();
        for problem in &problems {
            tracing::warn!(taxonomy = %self.name, "{problem}");
        }
        problems.is_empty()
    }
}

// =#========================================================================#=
// ITERATORS
// =#========================================================================#=
/// Iterator over the proper ancestors of a taxon, nearest first.
pub struct Ancestors<'a> {
    taxonomy: &'a Taxonomy,
    next: Option<TaxonIndex>,
}

impl Iterator for Ancestors<'_> {
    type Item = TaxonIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.taxonomy.nodes[current.slot()].parent;
        Some(current)
    }
}

impl Taxonomy {
    /// Returns an iterator over the subtree of `node` in pre-order (parents before children).
    ///
    /// Uses an explicit stack, so deep trees do not exhaust the call stack.
    pub fn pre_order(&self, node: TaxonIndex) -> PreOrderIter<'_> {
        PreOrderIter {
            taxonomy: self,
            stack: vec![node],
        }
    }

    /// Returns an iterator over the subtree of `node` in post-order (children before parents).
    pub fn post_order(&self, node: TaxonIndex) -> PostOrderIter<'_> {
        PostOrderIter {
            taxonomy: self,
            stack: vec![(node, false)],
        }
    }
}

/// Iterator for pre-order traversal (parents before children).
pub struct PreOrderIter<'a> {
    taxonomy: &'a Taxonomy,
    stack: Vec<TaxonIndex>,
}

impl Iterator for PreOrderIter<'_> {
    type Item = TaxonIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let taxonomy = self.taxonomy;
        // Push children in reverse, so the first child is visited first
        let children = &taxonomy.nodes[index.slot()].children;
        self.stack.extend(children.iter().rev().copied());
        Some(index)
    }
}

/// Iterator for post-order traversal (children before parents).
pub struct PostOrderIter<'a> {
    taxonomy: &'a Taxonomy,
    stack: Vec<(TaxonIndex, bool)>, // (index, children_visited)
}

impl Iterator for PostOrderIter<'_> {
    type Item = TaxonIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let taxonomy = self.taxonomy;
        while let Some((index, children_visited)) = self.stack.pop() {
            let children = &taxonomy.nodes[index.slot()].children;
            if children_visited || children.is_empty() {
                return Some(index);
            }
            self.stack.push((index, true));
            self.stack.extend(children.iter().rev().map(|c| (*c, false)));
        }
        None
    }
}
