//! Taxonomic ranks.
//!
//! Provides [Rank], the enumerated level of a taxon (species, genus, family, ...).
//! Every rank carries a numeric level, where coarser ranks have lower levels,
//! and a tier grouping it with its nearest major rank (e.g. `superfamily`,
//! `family`, `subfamily` and `tribe` all share the family tier).

use std::fmt;

// =#========================================================================#=
// RANK
// =#========================================================================#=
/// Enumerated rank of a taxon.
///
/// [Rank::NoRank] stands for taxa whose rank is unknown or that sit between
/// the recognized levels. It never takes part in rank comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rank {
    Domain,
    Superkingdom,
    Kingdom,
    Subkingdom,
    Infrakingdom,
    Superphylum,
    Phylum,
    Subphylum,
    Infraphylum,
    Superclass,
    Class,
    Subclass,
    Infraclass,
    Superorder,
    Order,
    Suborder,
    Infraorder,
    Parvorder,
    Superfamily,
    Family,
    Subfamily,
    Tribe,
    Subtribe,
    Genus,
    Subgenus,
    Section,
    Subsection,
    SpeciesGroup,
    SpeciesSubgroup,
    Species,
    Subspecies,
    InfraspecificName,
    Variety,
    Subvariety,
    Form,
    Subform,
    #[default]
    NoRank,
}

/// Label written for unranked taxa.
pub const NO_RANK_LABEL: &str = "no rank";

/// Label written for unranked taxa without children.
pub const NO_RANK_TERMINAL_LABEL: &str = "no rank - terminal";

/// (rank, canonical name, level, tier), coarsest first.
const RANK_TABLE: &[(Rank, &str, u16, u8)] = &[
    (Rank::Domain, "domain", 10, 0),
    (Rank::Superkingdom, "superkingdom", 90, 1),
    (Rank::Kingdom, "kingdom", 100, 1),
    (Rank::Subkingdom, "subkingdom", 110, 1),
    (Rank::Infrakingdom, "infrakingdom", 120, 1),
    (Rank::Superphylum, "superphylum", 190, 2),
    (Rank::Phylum, "phylum", 200, 2),
    (Rank::Subphylum, "subphylum", 210, 2),
    (Rank::Infraphylum, "infraphylum", 220, 2),
    (Rank::Superclass, "superclass", 290, 3),
    (Rank::Class, "class", 300, 3),
    (Rank::Subclass, "subclass", 310, 3),
    (Rank::Infraclass, "infraclass", 320, 3),
    (Rank::Superorder, "superorder", 390, 4),
    (Rank::Order, "order", 400, 4),
    (Rank::Suborder, "suborder", 410, 4),
    (Rank::Infraorder, "infraorder", 420, 4),
    (Rank::Parvorder, "parvorder", 430, 4),
    (Rank::Superfamily, "superfamily", 490, 5),
    (Rank::Family, "family", 500, 5),
    (Rank::Subfamily, "subfamily", 510, 5),
    (Rank::Tribe, "tribe", 520, 5),
    (Rank::Subtribe, "subtribe", 530, 5),
    (Rank::Genus, "genus", 600, 6),
    (Rank::Subgenus, "subgenus", 610, 6),
    (Rank::Section, "section", 620, 6),
    (Rank::Subsection, "subsection", 630, 6),
    (Rank::SpeciesGroup, "species group", 680, 6),
    (Rank::SpeciesSubgroup, "species subgroup", 690, 6),
    (Rank::Species, "species", 700, 7),
    (Rank::Subspecies, "subspecies", 710, 7),
    (Rank::InfraspecificName, "infraspecific name", 720, 7),
    (Rank::Variety, "variety", 730, 7),
    (Rank::Subvariety, "subvariety", 740, 7),
    (Rank::Form, "form", 750, 7),
    (Rank::Subform, "subform", 760, 7),
];

/// Spellings found in source taxonomies that name a rank in [RANK_TABLE].
const RANK_ALIASES: &[(&str, Rank)] = &[
    ("division", Rank::Phylum),
    ("subdivision", Rank::Subphylum),
    ("varietas", Rank::Variety),
    ("forma", Rank::Form),
    ("infraspecificname", Rank::InfraspecificName),
    ("species_group", Rank::SpeciesGroup),
    ("species_subgroup", Rank::SpeciesSubgroup),
];

impl Rank {
    /// Parses a rank name (case-insensitive, surrounding whitespace ignored).
    ///
    /// # Returns
    /// * `Some(Rank::NoRank)` for an empty string or "no rank" (also "no rank - terminal")
    /// * `Some(rank)` for a known rank name or alias
    /// * `None` if the string names no known rank
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        if lower.is_empty() || lower == NO_RANK_LABEL || lower == NO_RANK_TERMINAL_LABEL {
            return Some(Rank::NoRank);
        }
        RANK_TABLE
            .iter()
            .find(|(_, n, _, _)| *n == lower)
            .map(|(rank, ..)| *rank)
            .or_else(|| {
                RANK_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == lower)
                    .map(|(_, rank)| *rank)
            })
    }

    fn entry(self) -> Option<&'static (Rank, &'static str, u16, u8)> {
        RANK_TABLE.iter().find(|(rank, ..)| *rank == self)
    }

    /// Returns the canonical name of this rank ("no rank" for [Rank::NoRank]).
    pub fn name(self) -> &'static str {
        self.entry().map_or(NO_RANK_LABEL, |(_, name, ..)| name)
    }

    /// Returns the numeric level of this rank; coarser ranks have lower levels.
    /// [Rank::NoRank] has no level.
    pub fn level(self) -> Option<u16> {
        self.entry().map(|(_, _, level, _)| *level)
    }

    /// Returns the tier (major-rank group) of this rank.
    pub fn tier(self) -> Option<u8> {
        self.entry().map(|(.., tier)| *tier)
    }

    /// Whether this is a real rank, i.e. not [Rank::NoRank].
    pub fn is_ranked(self) -> bool {
        self != Rank::NoRank
    }

    /// Whether this rank is species or finer.
    pub fn is_species_or_finer(self) -> bool {
        matches!(self.level(), Some(level) if level >= SPECIES_LEVEL)
    }
}

const SPECIES_LEVEL: u16 = 700;

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
