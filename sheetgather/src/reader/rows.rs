//! Streaming worksheet row parser
//!
//! Parses one worksheet part incrementally with the quick-xml pull reader:
//! one dense `Vec<String>` per `<row>` element, in document order, without
//! materializing the part. Restartable only by re-opening the part.

use anyhow::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::BufRead;

use super::parser_utils::{decode_column, read_text_node};

/// Lazy, forward-only iterator over worksheet rows.
///
/// Each yielded row is dense from column 0 to the highest column seen in that
/// row; columns the source skipped hold empty strings. Row lengths therefore
/// vary and consumers must bounds-check before indexing.
pub struct RowIter<'a, R: BufRead> {
    reader: Reader<R>,
    shared: &'a [String],
    buf: Vec<u8>,
}

impl<'a, R: BufRead> RowIter<'a, R> {
    pub fn new(source: R, shared: &'a [String]) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            shared,
            buf: Vec::new(),
        }
    }

    /// Consume cell events until the row's end tag.
    ///
    /// Column addressing: an explicit "r" attribute overrides the running
    /// counter; afterwards the counter resumes one past that column, so
    /// address-less cells continue sequentially. Two cells decoding to the
    /// same column keep the later value.
    fn collect_row(&mut self) -> Result<Vec<String>> {
        let mut row: Vec<String> = Vec::new();
        let mut next_col = 0u32;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.local_name().as_ref() == b"c" => {
                    let (r_attr, t_attr) = cell_attrs(&e)?;
                    let col = r_attr
                        .as_deref()
                        .and_then(decode_column)
                        .unwrap_or(next_col);
                    next_col = col + 1;
                    let value = read_cell_value(
                        &mut self.reader,
                        t_attr.as_deref().unwrap_or(""),
                        self.shared,
                    )?;
                    place(&mut row, col, value);
                }
                Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                    // No value node at all: resolves to empty string.
                    let (r_attr, _) = cell_attrs(&e)?;
                    let col = r_attr
                        .as_deref()
                        .and_then(decode_column)
                        .unwrap_or(next_col);
                    next_col = col + 1;
                    place(&mut row, col, String::new());
                }
                Event::End(e) if e.local_name().as_ref() == b"row" => return Ok(row),
                Event::Eof => return Ok(row),
                _ => {}
            }
        }
    }
}

/// Owned decision extracted from a borrowed event, so the event buffer can
/// be released before the row body is consumed.
enum SheetToken {
    RowStart,
    RowEmpty,
    Eof,
    Other,
}

impl<R: BufRead> Iterator for RowIter<'_, R> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            let token = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"row" => SheetToken::RowStart,
                Ok(Event::Empty(e)) if e.local_name().as_ref() == b"row" => SheetToken::RowEmpty,
                Ok(Event::Eof) => SheetToken::Eof,
                Ok(_) => SheetToken::Other,
                Err(e) => return Some(Err(e.into())),
            };
            match token {
                SheetToken::RowStart => return Some(self.collect_row()),
                SheetToken::RowEmpty => return Some(Ok(Vec::new())),
                SheetToken::Eof => return None,
                SheetToken::Other => {}
            }
        }
    }
}

/// Read the optional address and type attributes of a `<c>` element.
fn cell_attrs(e: &BytesStart) -> Result<(Option<String>, Option<String>)> {
    let mut r_attr = None;
    let mut t_attr = None;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => r_attr = Some(attr.unescape_value()?.to_string()),
            b"t" => t_attr = Some(attr.unescape_value()?.to_string()),
            _ => {}
        }
    }
    Ok((r_attr, t_attr))
}

/// Consume a cell's children up to `</c>` and resolve its text value.
fn read_cell_value<R: BufRead>(
    reader: &mut Reader<R>,
    cell_type: &str,
    shared: &[String],
) -> Result<String> {
    let mut raw: Option<String> = None;
    let mut inline: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"v" => {
                let text = read_text_node(reader)?;
                // First value child wins.
                if raw.is_none() {
                    raw = Some(text);
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"v" => {
                if raw.is_none() {
                    raw = Some(String::new());
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"is" => {
                inline = Some(read_inline_string(reader)?);
            }
            Event::End(e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(resolve_value(cell_type, raw, inline, shared))
}

/// Inline strings concatenate every text run under `<is>` in document order.
fn read_inline_string<R: BufRead>(reader: &mut Reader<R>) -> Result<String> {
    let mut text = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                text.push_str(&read_text_node(reader)?);
            }
            Event::End(e) if e.local_name().as_ref() == b"is" => break,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}

fn resolve_value(
    cell_type: &str,
    raw: Option<String>,
    inline: Option<String>,
    shared: &[String],
) -> String {
    if cell_type == "inlineStr" {
        return inline.unwrap_or_default();
    }
    match raw {
        Some(v) => match cell_type {
            // Shared-string index: out-of-range or non-numeric recovers to
            // empty, never fails the row.
            "s" => match v.trim().parse::<usize>() {
                Ok(idx) => shared.get(idx).cloned().unwrap_or_default(),
                Err(_) => String::new(),
            },
            // Formula-cached strings, numbers and untyped values verbatim.
            _ => v,
        },
        None => inline.unwrap_or_default(),
    }
}

/// Grow the row with empty-string padding, then set `value` at `col`.
fn place(row: &mut Vec<String>, col: u32, value: String) {
    let idx = col as usize;
    if row.len() <= idx {
        row.resize(idx + 1, String::new());
    }
    row[idx] = value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse_all(xml: &str, shared: &[String]) -> Vec<Vec<String>> {
        RowIter::new(Cursor::new(xml.to_string()), shared)
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_explicit_addresses_backfill_gaps() {
        let xml = r#"<worksheet><sheetData>
<row r="1"><c r="A1"><v>1</v></c><c r="D1"><v>4</v></c></row>
</sheetData></worksheet>"#;
        let rows = parse_all(xml, &[]);
        assert_eq!(rows, vec![vec!["1", "", "", "4"]]);
    }

    #[test]
    fn test_running_counter_continues_after_override() {
        // The cell after D1 has no address and must land in column E.
        let xml = r#"<worksheet><sheetData>
<row><c r="D1"><v>d</v></c><c><v>e</v></c></row>
</sheetData></worksheet>"#;
        let rows = parse_all(xml, &[]);
        assert_eq!(rows, vec![vec!["", "", "", "d", "e"]]);
    }

    #[test]
    fn test_address_less_cells_are_sequential() {
        let xml = r#"<worksheet><sheetData>
<row><c><v>a</v></c><c><v>b</v></c><c><v>c</v></c></row>
</sheetData></worksheet>"#;
        let rows = parse_all(xml, &[]);
        assert_eq!(rows, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_shared_string_resolution() {
        let shared = vec!["Foods".to_string(), "Snacks".to_string()];
        let xml = r#"<worksheet><sheetData>
<row><c t="s"><v>0</v></c><c t="s"><v>1</v></c></row>
<row><c t="s"><v>9</v></c><c t="s"><v>oops</v></c></row>
</sheetData></worksheet>"#;
        let rows = parse_all(xml, &shared);
        assert_eq!(rows[0], vec!["Foods", "Snacks"]);
        // Out-of-range and non-numeric indices recover to empty strings.
        assert_eq!(rows[1], vec!["", ""]);
    }

    #[test]
    fn test_inline_string_concatenates_runs() {
        let xml = r#"<worksheet><sheetData>
<row><c t="inlineStr"><is><r><t>Sna</t></r><r><t>cks</t></r></is></c></row>
</sheetData></worksheet>"#;
        let rows = parse_all(xml, &[]);
        assert_eq!(rows, vec![vec!["Snacks"]]);
    }

    #[test]
    fn test_formula_cached_string_and_number_verbatim() {
        let xml = r#"<worksheet><sheetData>
<row><c t="str"><f>A1&amp;B1</f><v>Drinks</v></c><c><v>42.5</v></c></row>
</sheetData></worksheet>"#;
        let rows = parse_all(xml, &[]);
        assert_eq!(rows, vec![vec!["Drinks", "42.5"]]);
    }

    #[test]
    fn test_valueless_cell_resolves_empty() {
        let xml = r#"<worksheet><sheetData>
<row><c r="A1" s="3"/><c r="B1"><v>x</v></c></row>
</sheetData></worksheet>"#;
        let rows = parse_all(xml, &[]);
        assert_eq!(rows, vec![vec!["", "x"]]);
    }

    #[test]
    fn test_duplicate_column_last_write_wins() {
        let xml = r#"<worksheet><sheetData>
<row><c r="A1"><v>first</v></c><c r="A1"><v>second</v></c></row>
</sheetData></worksheet>"#;
        let rows = parse_all(xml, &[]);
        assert_eq!(rows, vec![vec!["second"]]);
    }

    #[test]
    fn test_oversized_address_falls_back_to_counter() {
        // A column prefix past the sheet-format maximum (or long enough to
        // overflow the decoder) must not blow up the row buffer; the cell
        // lands at the running-counter position instead.
        let xml = r#"<worksheet><sheetData>
<row><c r="A1"><v>a</v></c><c r="AAAAAAAA1"><v>b</v></c></row>
</sheetData></worksheet>"#;
        let rows = parse_all(xml, &[]);
        assert_eq!(rows, vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_namespace_prefixed_elements() {
        let xml = r#"<x:worksheet xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><x:sheetData>
<x:row><x:c r="A1" t="inlineStr"><x:is><x:t>Foods</x:t></x:is></x:c><x:c t="s"><x:v>0</x:v></x:c></x:row>
</x:sheetData></x:worksheet>"#;
        let shared = vec!["Snacks".to_string()];
        let rows = parse_all(xml, &shared);
        assert_eq!(rows, vec![vec!["Foods", "Snacks"]]);
    }

    #[test]
    fn test_empty_row_element_yields_empty_row() {
        let xml = r#"<worksheet><sheetData><row r="1"/><row r="2"><c><v>a</v></c></row></sheetData></worksheet>"#;
        let rows = parse_all(xml, &[]);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_empty());
        assert_eq!(rows[1], vec!["a"]);
    }
}
