//! Flag algebra for taxa.
//!
//! A taxon carries two disjoint [Flags] sets:
//! - *proper* flags assert something about exactly this taxon,
//! - *inferred* flags are implied by an ancestor or by the taxon's descendants.
//!
//! Flags fall into four groups:
//! - heritable flags ([Flags::HERITABLE]), each written with an `_inherited`
//!   suffix when found in the inferred set,
//! - former-container markers ([Flags::FORMER_CONTAINER]), set once, never inherited,
//! - annotations ([Flags::FORCED_VISIBLE], [Flags::EDITED], plus the heritable
//!   `hidden` and `extinct`),
//! - derived-only flags ([Flags::DERIVED]) computed by the classification
//!   algorithms.
//!
//! The string form is a comma-separated list in a fixed category order,
//! see [encode_flags] and [parse_flags].

bitflags::bitflags! {
    /// A set of taxon flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        /// Not an operational taxonomic unit (e.g. "uncultured" or a placeholder).
        const NOT_OTU = 1 << 0;
        /// Hybrid taxon.
        const HYBRID = 1 << 1;
        /// Virus or below.
        const VIRAL = 1 << 2;
        /// Placement within parent asserted to be uncertain.
        const INCERTAE_SEDIS = 1 << 3;
        /// Placement within parent is a guess of the merge process.
        const UNPLACED = 1 << 4;
        /// Formerly inside an "unclassified ..." container.
        const UNCLASSIFIED = 1 << 5;
        /// Formerly inside an "environmental samples" container.
        const ENVIRONMENTAL = 1 << 6;
        /// Rank is badly out of line with its siblings.
        const MAJOR_RANK_CONFLICT = 1 << 7;
        /// Explicitly hidden.
        const HIDDEN = 1 << 8;
        /// Extinct.
        const EXTINCT = 1 << 9;
        /// Emptied container stub.
        const WAS_CONTAINER = 1 << 10;
        /// Emptied by a merge.
        const MERGED = 1 << 11;
        /// Emptied because its sources disagree.
        const INCONSISTENT = 1 << 12;
        /// Overrides any hiding flag.
        const FORCED_VISIBLE = 1 << 13;
        /// Touched by a manual edit.
        const EDITED = 1 << 14;
        /// Has a sibling of finer rank.
        const SIBLING_HIGHER = 1 << 15;
        /// Has a sibling of coarser rank.
        const SIBLING_LOWER = 1 << 16;
        /// Below a species-rank ancestor.
        const INFRASPECIFIC = 1 << 17;
        /// No species (or finer) in the subtree.
        const BARREN = 1 << 18;
    }
}

impl Flags {
    /// Flags passed down from a taxon to all of its descendants.
    pub const HERITABLE: Flags = Flags::NOT_OTU
        .union(Flags::HYBRID)
        .union(Flags::VIRAL)
        .union(Flags::INCERTAE_SEDIS)
        .union(Flags::UNPLACED)
        .union(Flags::UNCLASSIFIED)
        .union(Flags::ENVIRONMENTAL)
        .union(Flags::MAJOR_RANK_CONFLICT)
        .union(Flags::HIDDEN)
        .union(Flags::EXTINCT);

    /// Uncertain-placement flags; cleared whenever a taxon is explicitly re-placed.
    pub const INCERTAE_SEDIS_ANY: Flags = Flags::INCERTAE_SEDIS
        .union(Flags::UNPLACED)
        .union(Flags::UNCLASSIFIED)
        .union(Flags::ENVIRONMENTAL)
        .union(Flags::MAJOR_RANK_CONFLICT);

    /// Markers of emptied containers; such taxa never regain children.
    pub const FORMER_CONTAINER: Flags = Flags::WAS_CONTAINER
        .union(Flags::MERGED)
        .union(Flags::INCONSISTENT);

    /// Flags that make a taxon hidden, unless [Flags::FORCED_VISIBLE] is set.
    pub const HIDING: Flags = Flags::NOT_OTU
        .union(Flags::HYBRID)
        .union(Flags::VIRAL)
        .union(Flags::INCERTAE_SEDIS_ANY)
        .union(Flags::HIDDEN);

    /// Flags computed by the classification algorithms only.
    pub const DERIVED: Flags = Flags::SIBLING_HIGHER
        .union(Flags::SIBLING_LOWER)
        .union(Flags::INFRASPECIFIC)
        .union(Flags::BARREN);

    /// Flags that may appear only in the inferred set.
    pub const INFERRED_ONLY: Flags = Flags::INFRASPECIFIC.union(Flags::BARREN);
}

// =#========================================================================#=
// STRING ENCODING
// =#========================================================================#=
/// Which of the two flag sets a spelling belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Home {
    /// Proper as `name`, inferred as `name_inherited`
    Either,
    Proper,
    Inferred,
}

/// Canonical spellings, in encoding order.
const SPELLINGS: &[(Flags, &str, Home)] = &[
    (Flags::NOT_OTU, "not_otu", Home::Either),
    (Flags::HYBRID, "hybrid", Home::Either),
    (Flags::VIRAL, "viral", Home::Either),
    (Flags::INCERTAE_SEDIS, "incertae_sedis", Home::Either),
    (Flags::UNPLACED, "unplaced", Home::Either),
    (Flags::UNCLASSIFIED, "unclassified", Home::Either),
    (Flags::ENVIRONMENTAL, "environmental", Home::Either),
    (Flags::MAJOR_RANK_CONFLICT, "major_rank_conflict", Home::Either),
    (Flags::HIDDEN, "hidden", Home::Either),
    (Flags::EXTINCT, "extinct", Home::Either),
    (Flags::WAS_CONTAINER, "was_container", Home::Proper),
    (Flags::MERGED, "merged", Home::Proper),
    (Flags::INCONSISTENT, "inconsistent", Home::Proper),
    (Flags::FORCED_VISIBLE, "forced_visible", Home::Proper),
    (Flags::EDITED, "edited", Home::Proper),
    (Flags::SIBLING_HIGHER, "sibling_higher", Home::Proper),
    (Flags::SIBLING_LOWER, "sibling_lower", Home::Proper),
    (Flags::INFRASPECIFIC, "infraspecific", Home::Inferred),
    (Flags::BARREN, "barren", Home::Inferred),
];

const INHERITED_SUFFIX: &str = "_inherited";

/// Old spellings; `None` means the token is accepted and dropped.
const LEGACY_ALIASES: &[(&str, Option<(Flags, Home)>)] = &[
    ("incertae_sedis_direct", Some((Flags::INCERTAE_SEDIS, Home::Proper))),
    ("unclassified_direct", Some((Flags::UNCLASSIFIED, Home::Proper))),
    ("environmental_direct", Some((Flags::ENVIRONMENTAL, Home::Proper))),
    ("extinct_direct", Some((Flags::EXTINCT, Home::Proper))),
    ("major_rank_conflict_direct", Some((Flags::MAJOR_RANK_CONFLICT, Home::Proper))),
    ("hidden_direct", Some((Flags::HIDDEN, Home::Proper))),
    ("tattered", Some((Flags::INCONSISTENT, Home::Proper))),
    ("siblinghigher", Some((Flags::SIBLING_HIGHER, Home::Proper))),
    ("siblinglower", Some((Flags::SIBLING_LOWER, Home::Proper))),
    ("tattered_inherited", None),
    ("sibling_higher_inherited", None),
    ("forced_visible_inherited", None),
];

/// Result of parsing a flag string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFlags {
    /// Flags asserted of the taxon itself
    pub proper: Flags,
    /// Flags implied by relatives
    pub inferred: Flags,
    /// Tokens that name no known flag
    pub unknown: Vec<String>,
}

/// Encodes a proper/inferred pair of flag sets as a comma-separated string.
///
/// Categories are written in a fixed order; for each category the proper
/// spelling precedes the inherited one. Flags outside their home set (e.g. a
/// derived flag in the wrong set) are written with their canonical spelling
/// and thus land in their home set when parsed again.
///
/// # Example
/// ```
/// use taxotree::model::flags::{Flags, encode_flags};
///
/// let s = encode_flags(Flags::EXTINCT, Flags::HIDDEN | Flags::BARREN);
/// assert_eq!(s, "hidden_inherited,extinct,barren");
/// ```
pub fn encode_flags(proper: Flags, inferred: Flags) -> String {
    let mut tokens: Vec<String> = Vec::new();
    for (flag, name, home) in SPELLINGS {
        let in_proper = proper.contains(*flag);
        let in_inferred = inferred.contains(*flag);
        match home {
            Home::Either => {
                if in_proper {
                    tokens.push((*name).to_string());
                }
                if in_inferred {
                    tokens.push(format!("{name}{INHERITED_SUFFIX}"));
                }
            }
            Home::Proper | Home::Inferred => {
                if in_proper || in_inferred {
                    tokens.push((*name).to_string());
                }
            }
        }
    }
    tokens.join(",")
}

/// Parses a comma-separated flag string, accepting legacy spellings.
///
/// Parsing is total: unknown tokens are collected in [ParsedFlags::unknown]
/// and otherwise ignored. Whitespace around tokens is ignored.
pub fn parse_flags(s: &str) -> ParsedFlags {
    let mut parsed = ParsedFlags::default();
    for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match lookup_token(token) {
            Some(Some((flag, Home::Inferred))) => parsed.inferred |= flag,
            Some(Some((flag, _))) => parsed.proper |= flag,
            Some(None) => {}
            None => parsed.unknown.push(token.to_string()),
        }
    }
    parsed
}

/// Looks up a single token; `Some(None)` for accepted-but-dropped tokens.
fn lookup_token(token: &str) -> Option<Option<(Flags, Home)>> {
    if let Some((flag, _, home)) = SPELLINGS.iter().find(|(_, name, _)| *name == token) {
        return Some(Some((*flag, *home)));
    }
    if let Some(stem) = token.strip_suffix(INHERITED_SUFFIX) {
        if let Some((flag, ..)) = SPELLINGS
            .iter()
            .find(|(_, name, home)| *name == stem && *home == Home::Either)
        {
            return Some(Some((*flag, Home::Inferred)));
        }
    }
    LEGACY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, target)| *target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_flag_has_exactly_one_spelling() {
        let mut seen = Flags::empty();
        for (flag, ..) in SPELLINGS {
            assert!(!seen.intersects(*flag));
            seen |= *flag;
        }
        assert_eq!(seen, Flags::all());
    }

    #[test]
    fn inherited_suffix_only_for_heritable() {
        assert_eq!(lookup_token("barren_inherited"), None);
        assert_eq!(
            lookup_token("viral_inherited"),
            Some(Some((Flags::VIRAL, Home::Inferred)))
        );
    }
}
