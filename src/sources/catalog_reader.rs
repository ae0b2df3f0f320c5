//! # Source catalog I/O
//!
//! Readers and writers for the two file formats exchanged around the candidate filter.
//!
//! ## Raw source catalogs
//! -----------------
//! Whitespace-separated ASCII, one source per line, [`SOURCE_COLUMNS`] numeric columns
//! in [`SourceRecord`] order. Lines starting with `#` (extractor headers) and blank
//! lines are skipped. Any other line that is not exactly twelve numbers is a
//! [`ParseCatalogError`] carrying its 1-based line number.
//!
//! ## Candidate lists
//! -----------------
//! CSV with a header row, one [`SourceRecord`] per row (serde field names). One file
//! per image; the image index is not stored in the file and comes from the epoch
//! passed to [`read_candidates_csv`].
use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Write},
};

use camino::Utf8Path;
use thiserror::Error;

use crate::{
    skymotion_errors::SkymotionError,
    sources::{Catalog, ImageCandidates, SourceRecord, SOURCE_COLUMNS},
    time::ImageEpoch,
};

/// Line-level parsing errors for raw source catalogs.
///
/// Variants
/// -----------------
/// * `WrongColumnCount` – the line does not hold twelve columns; payload is `(line, found)`.
/// * `InvalidNumber` – a column is not a number; payload is `(line, offending text)`.
#[derive(Error, Debug, PartialEq)]
pub enum ParseCatalogError {
    #[error("line {0}: expected 12 columns, found {1}")]
    WrongColumnCount(usize, usize),
    #[error("line {0}: invalid number {1:?}")]
    InvalidNumber(usize, String),
}

/// Parse one data line into a [`SourceRecord`].
fn parse_source_line(line_number: usize, line: &str) -> Result<SourceRecord, ParseCatalogError> {
    let mut columns = [0.0; SOURCE_COLUMNS];
    let mut found = 0;

    for token in line.split_whitespace() {
        if found == SOURCE_COLUMNS {
            return Err(ParseCatalogError::WrongColumnCount(
                line_number,
                line.split_whitespace().count(),
            ));
        }
        columns[found] = token
            .parse::<f64>()
            .map_err(|_| ParseCatalogError::InvalidNumber(line_number, token.to_string()))?;
        found += 1;
    }

    if found != SOURCE_COLUMNS {
        return Err(ParseCatalogError::WrongColumnCount(line_number, found));
    }
    Ok(SourceRecord::from_columns(&columns))
}

/// Parse a whole raw catalog from any buffered reader.
///
/// Return
/// ----------
/// * The records in file order, or the first line error encountered.
pub fn parse_source_catalog<R: BufRead>(reader: R) -> Result<Vec<SourceRecord>, SkymotionError> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        records.push(parse_source_line(i + 1, trimmed)?);
    }
    Ok(records)
}

/// Read the raw catalog of the image described by `epoch`.
///
/// Arguments
/// -----------------
/// * `path` – ASCII catalog file.
/// * `epoch` – timing metadata of the image; its index becomes the catalog's index.
pub fn read_source_catalog(path: &Utf8Path, epoch: ImageEpoch) -> Result<Catalog, SkymotionError> {
    let file = File::open(path)?;
    let records = parse_source_catalog(BufReader::new(file))?;
    Ok(Catalog::new(epoch, records))
}

/// Serialize candidate records as CSV (header + one row per candidate).
pub fn write_candidates<W: Write>(
    writer: W,
    candidates: &ImageCandidates,
) -> Result<(), SkymotionError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in candidates.records() {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Deserialize candidate records written by [`write_candidates`].
pub fn read_candidates<R: Read>(
    reader: R,
    epoch: ImageEpoch,
) -> Result<ImageCandidates, SkymotionError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let records = rdr
        .deserialize::<SourceRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ImageCandidates::new(epoch, records))
}

/// Write the candidate list of one image to `path`.
pub fn write_candidates_csv(
    path: &Utf8Path,
    candidates: &ImageCandidates,
) -> Result<(), SkymotionError> {
    write_candidates(File::create(path)?, candidates)
}

/// Read the candidate list of the image described by `epoch` from `path`.
pub fn read_candidates_csv(
    path: &Utf8Path,
    epoch: ImageEpoch,
) -> Result<ImageCandidates, SkymotionError> {
    read_candidates(File::open(path)?, epoch)
}
