//! Publication date embedded in an annex workbook
//!
//! The first sheet of every annex carries a title line such as
//! `ANNEX III, Last update: 05/03/2024` in cell A3. When the server sends no
//! freshness header, that date is the next best marker before a content hash.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use regex::Regex;
use std::io::Cursor;
use std::sync::OnceLock;
use tracing::debug;

/// Zero-based (row, column) of cell A3
const STAMP_CELL: (u32, u32) = (2, 0);

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Last update:\s*(\d{2}/\d{2}/\d{4})").expect("valid regex")
    })
}

/// `DD/MM/YYYY` from a title line, if it carries one
pub fn parse_last_update(text: &str) -> Option<String> {
    date_pattern()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Read the `Last update` date from cell A3 of the first sheet
///
/// Returns `None` for bodies that are not a readable xls/xlsx workbook, an
/// empty first sheet, or a title without a date.
pub fn last_update(bytes: &[u8]) -> Option<String> {
    let mut workbook = match open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())) {
        Ok(workbook) => workbook,
        Err(e) => {
            debug!("Body is not a readable workbook: {}", e);
            return None;
        }
    };

    let range = match workbook.worksheet_range_at(0)? {
        Ok(range) => range,
        Err(e) => {
            debug!("Failed to read first sheet: {}", e);
            return None;
        }
    };

    match range.get_value(STAMP_CELL)? {
        Data::String(text) => parse_last_update(text),
        _ => None,
    }
}
