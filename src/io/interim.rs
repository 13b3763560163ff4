//! Tabular interim format: a directory with `taxonomy.tsv`, `synonyms.tsv`
//! and `forwards.tsv`.
//!
//! Each file starts with a header row naming its columns; fields are
//! separated by `\t|\t` and rows may end with `\t|`. Columns are found by
//! header name, so their order does not matter and unknown columns are
//! ignored.
//!
//! | File | Columns |
//! |---|---|
//! | taxonomy.tsv | uid, parent_uid, name, rank, sourceinfo, uniqname, flags |
//! | synonyms.tsv | name, uid, type, uniqname, sourceinfo |
//! | forwards.tsv | id, replacement |
//!
//! Only `taxonomy.tsv` is required when reading.

use crate::io::defs::*;
use crate::io::error::{LoadError, LoadErrorKind};
use crate::io::loader::{LoadReport, Loader, SynonymRow, TaxonRow};
use crate::model::taxonomy::Taxonomy;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

// =#========================================================================#=
// READING
// =#========================================================================#=
/// Loads a taxonomy directory into `taxonomy` and runs
/// [Loader::finish](crate::io::loader::Loader::finish).
///
/// # Errors
/// Only I/O failures and unusable headers abort; bad rows are skipped and
/// counted in the [LoadReport].
///
/// # Example
/// ```no_run
/// use taxotree::io::interim::load_taxonomy_dir;
/// use taxotree::model::Taxonomy;
///
/// let (taxonomy, report) = load_taxonomy_dir("ncbi/", Taxonomy::new("ncbi"))?;
/// println!("{} taxa, {} rows skipped", taxonomy.num_taxa(), report.skipped);
/// # Ok::<(), taxotree::io::LoadError>(())
/// ```
pub fn load_taxonomy_dir<P: AsRef<Path>>(dir: P, taxonomy: Taxonomy) -> Result<(Taxonomy, LoadReport), LoadError> {
    let dir = dir.as_ref();
    let mut loader = Loader::new(taxonomy);

    read_taxa(BufReader::new(File::open(dir.join(TAXONOMY_FILE))?), &mut loader)?;
    let synonyms = dir.join(SYNONYMS_FILE);
    if synonyms.exists() {
        read_synonyms(BufReader::new(File::open(synonyms)?), &mut loader)?;
    }
    let forwards = dir.join(FORWARDS_FILE);
    if forwards.exists() {
        read_forwards(BufReader::new(File::open(forwards)?), &mut loader)?;
    }
    Ok(loader.finish())
}

/// Reads taxon rows.
pub fn read_taxa<R: BufRead>(reader: R, loader: &mut Loader) -> Result<(), LoadError> {
    read_rows(reader, &[UID, PARENT_UID, NAME], loader, |loader, fields| {
        let parent = fields.get(PARENT_UID);
        let row = TaxonRow {
            id: fields.get(UID).to_string(),
            parent_id: (!parent.is_empty()).then(|| parent.to_string()),
            name: Some(fields.get(NAME)).filter(|n| !n.is_empty()).map(str::to_string),
            rank: fields.get(RANK).to_string(),
            flags: fields.get(FLAGS).to_string(),
            source_info: fields.get(SOURCE_INFO).to_string(),
            source_id: None,
        };
        loader.add_taxon(&row).map(|_| ())
    })
}

/// Reads synonym rows.
pub fn read_synonyms<R: BufRead>(reader: R, loader: &mut Loader) -> Result<(), LoadError> {
    read_rows(reader, &[NAME, UID], loader, |loader, fields| {
        let row = SynonymRow {
            owner_id: fields.get(UID).to_string(),
            name: fields.get(NAME).to_string(),
            kind: fields.get(TYPE).to_string(),
            source_info: fields.get(SOURCE_INFO).to_string(),
            id: None,
        };
        loader.add_synonym(&row).map(|_| ())
    })
}

/// Reads forward rows.
pub fn read_forwards<R: BufRead>(reader: R, loader: &mut Loader) -> Result<(), LoadError> {
    read_rows(reader, &[ID, REPLACEMENT], loader, |loader, fields| {
        loader.add_forward(fields.get(ID), fields.get(REPLACEMENT))
    })
}

/// Fields of one row, addressed by column name.
struct Fields<'a> {
    header: &'a [String],
    values: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    /// Returns the field of `column`; empty if the column or field is absent.
    fn get(&self, column: &str) -> &'a str {
        self.header
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i).copied())
            .unwrap_or("")
    }
}

fn read_rows<R, F>(reader: R, required: &[&str], loader: &mut Loader, mut handle: F) -> Result<(), LoadError>
where
    R: BufRead,
    F: FnMut(&mut Loader, &Fields) -> Result<(), LoadError>,
{
    let mut lines = reader.lines();
    let Some(header) = lines.next().transpose()? else {
        return Ok(());
    };
    let header: Vec<String> = split_row(&header).into_iter().map(str::to_string).collect();
    for column in required {
        if !header.iter().any(|c| c == column) {
            return Err(LoadError::new(LoadErrorKind::BadHeader(format!("missing column {column}"))));
        }
    }
    let needed = required
        .iter()
        .filter_map(|r| header.iter().position(|c| c == r))
        .max()
        .map_or(0, |i| i + 1);

    for (number, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_number = number + 2;
        let values = split_row(&line);
        if values.len() < needed {
            let kind = LoadErrorKind::TooFewFields {
                expected: needed,
                found: values.len(),
            };
            loader.skip(LoadError::new(kind).at_line(line_number, &line));
            continue;
        }
        let fields = Fields { header: &header, values };
        if let Err(err) = handle(loader, &fields) {
            loader.skip(err.at_line(line_number, &line));
        }
    }
    Ok(())
}

fn split_row(line: &str) -> Vec<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let line = line.strip_suffix(ROW_TERMINATOR).unwrap_or(line);
    line.split(FIELD_SEPARATOR).collect()
}

// =#========================================================================#=
// WRITING
// =#========================================================================#=
/// Writes `taxonomy.tsv`, `synonyms.tsv` and `forwards.tsv` into `dir`,
/// creating it if needed.
///
/// # Errors
/// I/O failures, and taxa without id (see [write_taxa]).
pub fn write_taxonomy_dir<P: AsRef<Path>>(taxonomy: &Taxonomy, dir: P) -> io::Result<()> {
    let dir = dir.as_ref();
    check_ids(taxonomy)?;
    std::fs::create_dir_all(dir)?;
    write_taxa(taxonomy, BufWriter::new(File::create(dir.join(TAXONOMY_FILE))?))?;
    write_synonyms(taxonomy, BufWriter::new(File::create(dir.join(SYNONYMS_FILE))?))?;
    write_forwards(taxonomy, BufWriter::new(File::create(dir.join(FORWARDS_FILE))?))?;
    Ok(())
}

/// Writes the taxon rows (with header) of `taxonomy`.
///
/// # Errors
/// [io::ErrorKind::InvalidInput], before anything is written, if a live taxon
/// has no id: its row and its children's parent references could not be read
/// back. Give such taxa ids first, e.g. with
/// [Taxonomy::assign_new_ids] or [Taxonomy::assign_dummy_ids].
pub fn write_taxa<W: Write>(taxonomy: &Taxonomy, mut writer: W) -> io::Result<()> {
    check_ids(taxonomy)?;
    write_row(&mut writer, &TAXONOMY_COLUMNS)?;
    for record in taxonomy.taxon_records() {
        write_row(
            &mut writer,
            &[
                &record.id,
                &record.parent_id,
                &record.name,
                &record.rank,
                &record.sources,
                &record.unique_name,
                &record.flags,
            ],
        )?;
    }
    writer.flush()
}

/// Writes the synonym rows (with header) of `taxonomy`.
pub fn write_synonyms<W: Write>(taxonomy: &Taxonomy, mut writer: W) -> io::Result<()> {
    write_row(&mut writer, &SYNONYM_COLUMNS)?;
    for record in taxonomy.synonym_records() {
        write_row(
            &mut writer,
            &[
                &record.name,
                &record.owner_id,
                &record.kind,
                &record.owner_name,
                &record.sources,
            ],
        )?;
    }
    writer.flush()
}

/// Writes the forward rows (with header) of `taxonomy`.
pub fn write_forwards<W: Write>(taxonomy: &Taxonomy, mut writer: W) -> io::Result<()> {
    write_row(&mut writer, &FORWARD_COLUMNS)?;
    for (alias, canonical) in taxonomy.forward_records() {
        write_row(&mut writer, &[&alias, &canonical])?;
    }
    writer.flush()
}

fn check_ids(taxonomy: &Taxonomy) -> io::Result<()> {
    let forest = taxonomy.forest();
    let id_less: Vec<_> = taxonomy
        .pre_order(forest)
        .skip(1)
        .filter(|node| taxonomy[*node].id().is_none())
        .collect();
    match id_less.first() {
        None => Ok(()),
        Some(first) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} taxa without id, first {}", id_less.len(), taxonomy[*first].display_name()),
        )),
    }
}

fn write_row<W: Write, S: AsRef<str>>(writer: &mut W, fields: &[S]) -> io::Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            writer.write_all(FIELD_SEPARATOR.as_bytes())?;
        }
        writer.write_all(field.as_ref().as_bytes())?;
    }
    writer.write_all(ROW_TERMINATOR.as_bytes())?;
    writer.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_handles_terminator_and_empty_fields() {
        assert_eq!(split_row("1\t|\t\t|\tlife\t|"), vec!["1", "", "life"]);
        assert_eq!(split_row("1\t|\t\t|\tlife"), vec!["1", "", "life"]);
        assert_eq!(split_row("1\t|\t2\t|\t\t|\r"), vec!["1", "2", ""]);
    }
}
