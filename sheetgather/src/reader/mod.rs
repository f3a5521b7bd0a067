//! Spreadsheet container access
//!
//! Opens XLSX files as ZIP archives and exposes the two part families the
//! extraction pipeline consumes: the shared string part and one worksheet
//! part. Everything else in the container is ignored.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

pub mod parser_utils;
pub mod rows;
pub mod shared_strings;

pub use rows::RowIter;
pub use shared_strings::load_shared_strings;

use crate::error::FileError;

/// Canonical first worksheet part.
pub const FIRST_SHEET_PART: &str = "xl/worksheets/sheet1.xml";

/// Open `path` as a spreadsheet container.
///
/// Anything the ZIP reader rejects (wrong signature, zero-byte file,
/// truncated central directory) is reported as `NotAContainer`; callers skip
/// the file rather than failing the batch.
pub fn open_container(path: &Path) -> Result<ZipArchive<BufReader<File>>, FileError> {
    let file = File::open(path)?;
    ZipArchive::new(BufReader::new(file)).map_err(|_| FileError::NotAContainer)
}

/// Pick the worksheet part to read.
///
/// Prefers the canonical `sheet1.xml`; otherwise the first worksheet-shaped
/// part in archive enumeration order. That order is not guaranteed to match
/// the workbook's visual sheet order when the archive lists parts unusually;
/// known limitation, not special-cased further.
pub fn select_worksheet(archive: &mut ZipArchive<impl Read + Seek>) -> Option<String> {
    if archive.by_name(FIRST_SHEET_PART).is_ok() {
        return Some(FIRST_SHEET_PART.to_string());
    }
    for i in 0..archive.len() {
        let name = match archive.by_index(i) {
            Ok(file) => file.name().to_string(),
            Err(_) => continue,
        };
        if name.starts_with("xl/worksheets/sheet") && name.ends_with(".xml") {
            return Some(name);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn archive_with_parts(names: &[&str]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for name in names {
            zip.start_file(*name, options).unwrap();
            zip.write_all(b"<x/>").unwrap();
        }
        let cursor = zip.finish().unwrap();
        ZipArchive::new(cursor).unwrap()
    }

    #[test]
    fn test_prefers_canonical_first_sheet() {
        let mut archive = archive_with_parts(&[
            "xl/worksheets/sheet3.xml",
            "xl/worksheets/sheet1.xml",
        ]);
        assert_eq!(select_worksheet(&mut archive).as_deref(), Some(FIRST_SHEET_PART));
    }

    #[test]
    fn test_falls_back_to_enumeration_order() {
        let mut archive = archive_with_parts(&[
            "xl/workbook.xml",
            "xl/worksheets/sheet7.xml",
            "xl/worksheets/sheet2.xml",
        ]);
        assert_eq!(
            select_worksheet(&mut archive).as_deref(),
            Some("xl/worksheets/sheet7.xml")
        );
    }

    #[test]
    fn test_no_worksheet_part() {
        let mut archive = archive_with_parts(&["xl/workbook.xml", "xl/styles.xml"]);
        assert_eq!(select_worksheet(&mut archive), None);
    }
}
