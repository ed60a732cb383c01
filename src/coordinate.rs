//! Cell coordinate codec
//!
//! Converts zero-based column indices to spreadsheet column labels
//! (`0 -> A`, `25 -> Z`, `26 -> AA`, `16383 -> XFD`) and coordinates such as
//! `"AB12"` back to one-based column numbers.

use crate::error::{ExcelError, Result};

/// Largest column count a worksheet may declare (`XFD`)
pub const MAX_COLUMNS: u32 = 16_384;

/// Convert a zero-based column index to its letter label.
///
/// Labels have no zero digit: after taking the remainder, the next index is
/// `index / 26 - 1` rather than `index / 26`.
///
/// ```
/// use excelbind::coordinate::column_label;
///
/// assert_eq!(column_label(0), "A");
/// assert_eq!(column_label(26), "AA");
/// assert_eq!(column_label(16383), "XFD");
/// ```
pub fn column_label(index: u32) -> String {
    let mut buf = Vec::with_capacity(3);
    push_column_label(&mut buf, index);
    // only ASCII uppercase letters are ever pushed
    String::from_utf8(buf).unwrap_or_default()
}

/// Signed variant of [`column_label`] for indices coming from untyped sources.
pub fn column_label_checked(index: i64) -> Result<String> {
    let index = u32::try_from(index).map_err(|_| {
        ExcelError::InvalidCell(format!("column index {} is out of range", index))
    })?;
    Ok(column_label(index))
}

/// Append the label of a zero-based column index to an XML buffer.
#[inline]
pub fn push_column_label(buf: &mut Vec<u8>, index: u32) {
    let mut letters = [0u8; 8];
    let mut len = 0;
    let mut n = index as i64;
    while n >= 0 {
        letters[len] = b'A' + (n % 26) as u8;
        len += 1;
        n = n / 26 - 1;
    }
    letters[..len].reverse();
    buf.extend_from_slice(&letters[..len]);
}

/// Build a full cell reference such as `"C7"` from a zero-based column and a
/// one-based row number.
pub fn cell_reference(col: u32, row: u32) -> String {
    let mut buf = Vec::with_capacity(8);
    push_column_label(&mut buf, col);
    buf.extend_from_slice(itoa::Buffer::new().format(row).as_bytes());
    String::from_utf8(buf).unwrap_or_default()
}

/// Convert a coordinate (`"AA12"`, `"c3"`, `"XFD"`) to its one-based column number.
///
/// Only the leading letters are read; the row suffix is ignored. Columns past
/// `XFD` are rejected.
///
/// ```
/// use excelbind::coordinate::column_number;
///
/// assert_eq!(column_number("A1").unwrap(), 1);
/// assert_eq!(column_number("AA12").unwrap(), 27);
/// assert!(column_number("12").is_err());
/// assert!(column_number("XFE1").is_err());
/// ```
pub fn column_number(coordinate: &str) -> Result<u32> {
    let mut result: u32 = 0;
    for ch in coordinate.bytes() {
        if !ch.is_ascii_alphabetic() {
            break;
        }
        let digit = (ch.to_ascii_uppercase() - b'A' + 1) as u32;
        result = result * 26 + digit;
        if result > MAX_COLUMNS {
            return Err(ExcelError::InvalidCell(format!(
                "column of '{}' is past XFD",
                coordinate
            )));
        }
    }

    if result == 0 {
        return Err(ExcelError::InvalidCell(format!(
            "'{}' does not start with a column label",
            coordinate
        )));
    }
    Ok(result)
}

/// Parse the one-based row number of a coordinate such as `"B17"`.
pub fn row_number(coordinate: &str) -> Result<u32> {
    let digits = coordinate.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    digits
        .parse::<u32>()
        .ok()
        .filter(|r| *r > 0)
        .ok_or_else(|| ExcelError::InvalidCell(format!("no row number in '{}'", coordinate)))
}
