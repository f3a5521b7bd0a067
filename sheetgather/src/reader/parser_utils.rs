//! Low-level parsing utilities shared by the worksheet and string-table readers

use anyhow::Result;
use quick_xml::Reader;
use quick_xml::events::Event;

/// Highest zero-based column index a worksheet can address ("XFD").
pub const MAX_COLUMN: u32 = 16_383;

/// Decode the alphabetic prefix of an "A1"-style cell reference into a
/// zero-based column index ("A" -> 0, "Z" -> 25, "AA" -> 26). The row digits
/// are ignored; trailing characters after the first digit never contribute.
///
/// Returns `None` for references without letters and for columns past
/// `MAX_COLUMN`, so a hostile address can never drive row buffers to absurd
/// lengths; callers fall back to their running counter.
pub fn decode_column(cell_ref: &str) -> Option<u32> {
    let mut col = 0u32;
    let mut letters = 0;

    for ch in cell_ref.chars() {
        if ch.is_ascii_alphabetic() {
            col = col
                .checked_mul(26)?
                .checked_add(ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
            letters += 1;
        } else {
            break;
        }
    }

    if letters == 0 || col > MAX_COLUMN + 1 {
        return None;
    }
    Some(col - 1)
}

/// Read the text content of the current XML node, up to its end tag.
pub fn read_text_node<R: std::io::BufRead>(reader: &mut Reader<R>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(e.unescape()?.as_ref()),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::End(_) => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_column_single_letter() {
        assert_eq!(decode_column("A1"), Some(0));
        assert_eq!(decode_column("B2"), Some(1));
        assert_eq!(decode_column("Z26"), Some(25));
    }

    #[test]
    fn test_decode_column_multi_letter() {
        assert_eq!(decode_column("AA1"), Some(26));
        assert_eq!(decode_column("AB12"), Some(27));
        assert_eq!(decode_column("BA400"), Some(52));
    }

    #[test]
    fn test_decode_column_case_insensitive() {
        assert_eq!(decode_column("ab12"), decode_column("AB12"));
    }

    #[test]
    fn test_decode_column_rejects_missing_letters() {
        assert_eq!(decode_column("12"), None);
        assert_eq!(decode_column(""), None);
    }

    #[test]
    fn test_decode_column_rejects_out_of_range() {
        assert_eq!(decode_column("XFD1"), Some(MAX_COLUMN));
        // One past the sheet-format maximum.
        assert_eq!(decode_column("XFE1"), None);
        // Long enough to overflow u32 without checked arithmetic.
        assert_eq!(decode_column("AAAAAAAA1"), None);
    }
}
