//! Newick output of a taxonomy subtree.
//!
//! Every node is labeled, internal nodes included, e.g.
//! `((Homo,Pan)Hominini,Gorilla)Homininae;`. Branch lengths are not written.

use crate::model::taxon::TaxonIndex;
use crate::model::taxonomy::Taxonomy;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Extra buffer in Newick string length/capacity estimate
const BUFFER_CHARS: usize = 10;

/// Style for labeling nodes in Newick output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewickStyle {
    /// Taxon name (empty for anonymous taxa).
    #[default]
    Name,
    /// Taxon id (empty for taxa without id).
    Id,
    /// `name_id`, or whichever of the two exists.
    NameAndId,
}

/// Returns the Newick representation of the subtree of `root`, with closing semicolon.
///
/// Labels are quoted when they contain whitespace or Newick punctuation.
///
/// # Example
/// ```
/// use taxotree::io::newick::{to_newick, NewickStyle};
/// use taxotree::model::Taxonomy;
///
/// let mut tax = Taxonomy::new("demo");
/// let life = tax.new_taxon(Some("life"));
/// tax.add_root(life).unwrap();
/// for name in ["Bacteria", "Homo sapiens"] {
///     let child = tax.new_taxon(Some(name));
///     tax.attach(life, child).unwrap();
/// }
///
/// assert_eq!(to_newick(&tax, life, NewickStyle::Name), "(Bacteria,'Homo sapiens')life;");
/// ```
pub fn to_newick(taxonomy: &Taxonomy, root: TaxonIndex, style: NewickStyle) -> String {
    enum Step {
        Enter(TaxonIndex),
        Separator,
        Close(TaxonIndex),
    }

    let mut newick = String::with_capacity(estimate_newick_len(taxonomy, root, style));
    let mut stack = vec![Step::Enter(root)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(node) => {
                let children = taxonomy[node].children();
                if children.is_empty() {
                    newick.push_str(&quote_label(&label(taxonomy, node, style)));
                    continue;
                }
                newick.push('(');
                stack.push(Step::Close(node));
                for (i, child) in children.iter().enumerate().rev() {
                    stack.push(Step::Enter(*child));
                    if i > 0 {
                        stack.push(Step::Separator);
                    }
                }
            }
            Step::Separator => newick.push(','),
            Step::Close(node) => {
                newick.push(')');
                newick.push_str(&quote_label(&label(taxonomy, node, style)));
            }
        }
    }
    newick.push(';');
    newick
}

/// Writes the subtree of `root` as one Newick line to `path`.
pub fn write_newick_file<P: AsRef<Path>>(
    taxonomy: &Taxonomy,
    root: TaxonIndex,
    style: NewickStyle,
    path: P,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(to_newick(taxonomy, root, style).as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

fn label(taxonomy: &Taxonomy, node: TaxonIndex, style: NewickStyle) -> String {
    let taxon = &taxonomy[node];
    let name = taxon.name().unwrap_or_default();
    let id = taxon.id().unwrap_or_default();
    match style {
        NewickStyle::Name => name.to_string(),
        NewickStyle::Id => id.to_string(),
        NewickStyle::NameAndId if name.is_empty() || id.is_empty() => format!("{name}{id}"),
        NewickStyle::NameAndId => format!("{name}_{id}"),
    }
}

/// Quotes a label if it contains whitespace or Newick punctuation; single
/// quotes inside are doubled.
pub fn quote_label(label: &str) -> String {
    let needs_quotes = label
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, ',' | ';' | '(' | ')' | ':' | '[' | ']' | '\''));
    if needs_quotes {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}

/// Estimates the length of the Newick string of a subtree: two structural
/// characters per node plus the label lengths.
fn estimate_newick_len(taxonomy: &Taxonomy, root: TaxonIndex, style: NewickStyle) -> usize {
    const STRUCTURE_CHARS: usize = 2; // "(" and "," or ")"
    taxonomy
        .pre_order(root)
        .map(|node| STRUCTURE_CHARS + label(taxonomy, node, style).len())
        .sum::<usize>()
        + BUFFER_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting() {
        assert_eq!(quote_label("Homo"), "Homo");
        assert_eq!(quote_label("Homo sapiens"), "'Homo sapiens'");
        assert_eq!(quote_label("O'Brien's"), "'O''Brien''s'");
        assert_eq!(quote_label("a:b"), "'a:b'");
    }
}
