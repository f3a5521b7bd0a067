//! Shared string table loading

use anyhow::Result;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use super::parser_utils::read_text_node;

/// Conventional path of the shared string part.
pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Load the shared string table, one entry per `<si>` item, concatenating
/// direct text and rich-text run text in document order. Phonetic runs are
/// not cell text and are skipped.
///
/// Workbooks without shared strings are legal, so an absent part yields an
/// empty table. A corrupt part also degrades to an empty table: shared-string
/// cells then resolve to empty strings downstream instead of failing the
/// whole file.
pub fn load_shared_strings(archive: &mut ZipArchive<impl Read + Seek>) -> Vec<String> {
    read_shared_strings(archive).unwrap_or_default()
}

fn read_shared_strings(archive: &mut ZipArchive<impl Read + Seek>) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let ss_xml = match archive.by_name(SHARED_STRINGS_PART) {
        Ok(file) => file,
        Err(_) => return Ok(strings),
    };

    let mut reader = Reader::from_reader(BufReader::new(ss_xml));
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"rPh" => {
                let end = e.to_end().into_owned();
                let mut skip = Vec::new();
                reader.read_to_end_into(end.name(), &mut skip)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                current.push_str(&read_text_node(&mut reader)?);
            }
            Event::End(e) if e.local_name().as_ref() == b"si" => {
                strings.push(std::mem::take(&mut current));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}
