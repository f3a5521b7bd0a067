//! Header discovery and row projection
//!
//! Header rows are not guaranteed to sit on row 1, so each file gets a
//! bounded scan: normalize every cell and look for the first row containing
//! all required column names at once. Partial matches across different rows
//! never merge. After that row the scan switches to extraction and never
//! switches back.

use std::collections::BTreeSet;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::ExtractConfig;
use crate::error::FileError;
use crate::reader::{self, RowIter};

/// Comparison form used for header matching and duplicate-header filtering.
pub fn normalize(text: &str) -> String {
    text.trim().to_uppercase()
}

/// Column positions of the required columns in a located header row.
/// Rebuilt per file; header position never carries across files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMap {
    pub key_col: usize,
    pub value_col: usize,
}

enum ScanPhase {
    Searching,
    Extracting(HeaderMap),
}

/// Test one row for the full required set. `key_name` and `value_name` must
/// already be normalized. First occurrence wins when a name appears twice in
/// the header row.
pub fn match_header_row(row: &[String], key_name: &str, value_name: &str) -> Option<HeaderMap> {
    let normalized: Vec<String> = row.iter().map(|cell| normalize(cell)).collect();
    let key_col = normalized.iter().position(|cell| cell == key_name)?;
    let value_col = normalized.iter().position(|cell| cell == value_name)?;
    Some(HeaderMap { key_col, value_col })
}

/// Project one data row onto the required columns.
///
/// Rows shorter than the rightmost required column carry no usable data and
/// are skipped, as are rows with a blank key or value. A key equal to the
/// column name itself is a repeated header row inside the data region; a key
/// of literal "nan" is a pandas placeholder left behind by upstream exports.
fn project_row(row: &[String], header: HeaderMap, key_name: &str) -> Option<(String, String)> {
    if row.len() <= header.key_col.max(header.value_col) {
        return None;
    }
    let key = row[header.key_col].trim();
    let value = row[header.value_col].trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    if normalize(key) == key_name || key.eq_ignore_ascii_case("nan") {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// Run the full per-file pipeline: open the container, load shared strings,
/// select a worksheet, locate headers, and project every following row.
/// Returns the file's deduplicated (key, value) set.
pub fn extract_file(
    path: &Path,
    config: &ExtractConfig,
) -> Result<BTreeSet<(String, String)>, FileError> {
    let mut archive = reader::open_container(path)?;
    let shared = reader::load_shared_strings(&mut archive);

    let Some(sheet_part) = reader::select_worksheet(&mut archive) else {
        return Err(FileError::MissingPart("xl/worksheets/".to_string()));
    };
    let sheet = archive
        .by_name(&sheet_part)
        .map_err(|_| FileError::MissingPart(sheet_part.clone()))?;

    let rows = RowIter::new(BufReader::new(sheet), &shared);
    extract_rows(rows, &sheet_part, config)
}

/// Header scan plus extraction over a row stream.
pub(crate) fn extract_rows<R: BufRead>(
    rows: RowIter<'_, R>,
    part: &str,
    config: &ExtractConfig,
) -> Result<BTreeSet<(String, String)>, FileError> {
    let key_name = normalize(&config.key_column);
    let value_name = normalize(&config.value_column);

    let mut phase = ScanPhase::Searching;
    let mut scanned = 0usize;
    let mut pairs = BTreeSet::new();

    for row in rows {
        let row = row.map_err(|e| FileError::MalformedPart {
            part: part.to_string(),
            reason: e.to_string(),
        })?;

        match phase {
            ScanPhase::Searching => {
                if let Some(header) = match_header_row(&row, &key_name, &value_name) {
                    phase = ScanPhase::Extracting(header);
                    continue;
                }
                scanned += 1;
                if scanned >= config.header_scan_limit {
                    return Err(FileError::HeaderNotFound);
                }
            }
            ScanPhase::Extracting(header) => {
                if let Some(pair) = project_row(&row, header, &key_name) {
                    pairs.insert(pair);
                }
            }
        }
    }

    match phase {
        ScanPhase::Searching => Err(FileError::HeaderNotFound),
        ScanPhase::Extracting(_) => Ok(pairs),
    }
}
