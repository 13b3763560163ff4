//! Adding new taxa whose ids come from an external minting service.
//!
//! The caller describes the new taxa as [AdditionRequest]s, each with a
//! caller-chosen tag. Parents are referred to by existing id or by the tag of
//! another request in the same batch. An [IdMinter] turns tags into ids; if it
//! fails, ids are minted locally above the current maximum.

use crate::error::TaxonomyError;
use crate::event_log::Verdict;
use crate::model::flags::Flags;
use crate::model::qualified_id::QualifiedId;
use crate::model::rank::Rank;
use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;
use std::collections::HashMap;

/// Parent of a requested taxon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// An existing taxon with this id.
    Id(String),
    /// Another request of the same batch.
    Tag(String),
}

/// Description of one new taxon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionRequest {
    pub tag: String,
    pub name: String,
    pub rank: Rank,
    pub parent: ParentRef,
    pub sources: Vec<QualifiedId>,
}

impl AdditionRequest {
    pub fn new(tag: impl Into<String>, name: impl Into<String>, parent: ParentRef) -> Self {
        AdditionRequest {
            tag: tag.into(),
            name: name.into(),
            rank: Rank::NoRank,
            parent,
            sources: Vec::new(),
        }
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_source(mut self, source: QualifiedId) -> Self {
        self.sources.push(source);
        self
    }
}

/// Failure of an id-minting service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MintError {
    #[error("minting service unavailable: {0}")]
    Unavailable(String),
    #[error("minting service rejected the request: {0}")]
    Rejected(String),
}

/// Errors of [Taxonomy::add_new_taxa]; on error no taxon has been added.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdditionError {
    #[error("tag {0:?} is used by more than one request")]
    DuplicateTag(String),
    #[error("request {tag:?} names unknown parent id {id:?}")]
    UnknownParentId { tag: String, id: String },
    #[error("request {tag:?} names unknown parent tag {parent:?}")]
    UnknownParentTag { tag: String, parent: String },
    #[error("request {0:?} is part of a parent cycle")]
    TagCycle(String),
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),
}

/// Source of ids for new taxa: maps request tags to ids.
pub trait IdMinter {
    fn mint(&mut self, requests: &[AdditionRequest]) -> Result<HashMap<String, String>, MintError>;
}

/// In-process minter handing out consecutive numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialMinter {
    next: u64,
}

impl SequentialMinter {
    pub fn new(next: u64) -> Self {
        SequentialMinter { next }
    }

    /// Starts right above the largest numeric id of `taxonomy`.
    pub fn above(taxonomy: &Taxonomy) -> Self {
        SequentialMinter::new(taxonomy.max_numeric_id() + 1)
    }
}

impl IdMinter for SequentialMinter {
    fn mint(&mut self, requests: &[AdditionRequest]) -> Result<HashMap<String, String>, MintError> {
        Ok(requests
            .iter()
            .map(|r| {
                let id = self.next.to_string();
                self.next += 1;
                (r.tag.clone(), id)
            })
            .collect())
    }
}

impl Taxonomy {
    /// Creates, attaches and identifies a batch of new taxa.
    ///
    /// All requests are checked before anything changes: tags must be unique
    /// and every parent must resolve, without cycles among tags. New taxa are
    /// flagged `edited`. Ids come from `minter`; if it fails, or leaves a tag
    /// without a usable id, those taxa get local sequential ids instead.
    ///
    /// # Returns
    /// The new taxon for each tag.
    pub fn add_new_taxa(
        &mut self,
        requests: &[AdditionRequest],
        minter: &mut dyn IdMinter,
    ) -> Result<HashMap<String, TaxonIndex>, AdditionError> {
        let parents = self.check_additions(requests)?;

        let mut created: HashMap<String, TaxonIndex> = HashMap::new();
        for request in requests {
            let node = self.new_taxon(Some(&request.name));
            let taxon = self.node_mut(node);
            taxon.rank = request.rank;
            taxon.sources = request.sources.clone();
            taxon.proper |= Flags::EDITED;
            created.insert(request.tag.clone(), node);
        }
        for (request, parent) in requests.iter().zip(parents) {
            let parent = match parent {
                Ok(existing) => existing,
                Err(tag) => created[&tag],
            };
            self.attach(parent, created[&request.tag])?;
        }

        let mut minted = match minter.mint(requests) {
            Ok(ids) => ids,
            Err(err) => {
                tracing::warn!(%err, requests = requests.len(), "id minting failed, minting locally");
                HashMap::new()
            }
        };
        let mut fallback: Option<SequentialMinter> = None;
        for request in requests {
            let node = created[&request.tag];
            let bound = minted
                .remove(&request.tag)
                .is_some_and(|id| self.bind_id(node, &id).is_ok());
            if !bound {
                let local = fallback.get_or_insert_with(|| SequentialMinter::above(self));
                let id = local.next.to_string();
                local.next += 1;
                self.bind_id(node, &id)?;
            }
            let parent = self[node].parent().map_or("", |p| self[p].display_name());
            let detail = format!("added under {parent}");
            self.record(node, "addition", 1, Verdict::Interesting, detail);
        }
        Ok(created)
    }

    /// Resolves each request's parent to an existing taxon (`Ok`) or a tag of
    /// the batch (`Err`).
    fn check_additions(&self, requests: &[AdditionRequest]) -> Result<Vec<Result<TaxonIndex, String>>, AdditionError> {
        let mut by_tag: HashMap<&str, &AdditionRequest> = HashMap::new();
        for request in requests {
            if by_tag.insert(request.tag.as_str(), request).is_some() {
                return Err(AdditionError::DuplicateTag(request.tag.clone()));
            }
        }

        let mut parents = Vec::with_capacity(requests.len());
        for request in requests {
            let parent = match &request.parent {
                ParentRef::Id(id) => match self.lookup_id(id) {
                    Some(existing) => Ok(existing),
                    None => {
                        return Err(AdditionError::UnknownParentId {
                            tag: request.tag.clone(),
                            id: id.clone(),
                        });
                    }
                },
                ParentRef::Tag(parent) if by_tag.contains_key(parent.as_str()) => Err(parent.clone()),
                ParentRef::Tag(parent) => {
                    return Err(AdditionError::UnknownParentTag {
                        tag: request.tag.clone(),
                        parent: parent.clone(),
                    });
                }
            };
            parents.push(parent);
        }

        // Following tag parents must reach an existing taxon within one step per request.
        for request in requests {
            let mut current = request;
            let mut steps = 0;
            while let ParentRef::Tag(parent) = &current.parent {
                steps += 1;
                if steps > requests.len() {
                    return Err(AdditionError::TagCycle(request.tag.clone()));
                }
                current = by_tag[parent.as_str()];
            }
        }
        Ok(parents)
    }
}
