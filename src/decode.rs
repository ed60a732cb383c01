//! Cell value decoding and sparse row normalization

use crate::culture::Culture;
use crate::error::Result;
use crate::fast_writer::shared_strings::SharedStrings;
use crate::serial;
use crate::types::{Cell, CellDataType, Row};

/// Turns raw cells into their canonical string form
#[derive(Debug, Clone, Copy)]
pub struct CellDecoder<'a> {
    shared_strings: Option<&'a SharedStrings>,
    culture: &'a Culture,
    trim: bool,
}

impl<'a> CellDecoder<'a> {
    pub fn new(shared_strings: Option<&'a SharedStrings>, culture: &'a Culture, trim: bool) -> Self {
        CellDecoder {
            shared_strings,
            culture,
            trim,
        }
    }

    pub fn culture(&self) -> &'a Culture {
        self.culture
    }

    /// Decode one cell.
    ///
    /// - shared string: dereferenced, or the raw index text when the lookup misses
    /// - boolean: `"0"` is `FALSE`, every other value is `TRUE`
    /// - date serial: rendered with the culture's date-time pattern
    /// - anything else: the raw text, trimmed in trim mode
    pub fn decode(&self, cell: &Cell) -> Result<String> {
        let Some(raw) = cell.value.as_deref() else {
            return Ok(String::new());
        };

        match cell.data_type {
            CellDataType::SharedString => Ok(self.shared_string(raw)),
            CellDataType::Boolean => Ok(if raw == "0" { "FALSE" } else { "TRUE" }.to_string()),
            CellDataType::DateSerial => {
                let value = serial::parse_serial(raw)?;
                Ok(self.culture.format_datetime(&value))
            }
            _ if self.trim => Ok(raw.trim().to_string()),
            _ => Ok(raw.to_string()),
        }
    }

    fn shared_string(&self, raw: &str) -> String {
        let resolved = raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|index| self.shared_strings?.get(index));
        match resolved {
            Some(text) => text.to_string(),
            None => {
                log::warn!("shared string '{}' not found, keeping raw value", raw);
                raw.to_string()
            }
        }
    }
}

/// Expand a sparse row into `last_column` dense values.
///
/// When the row already holds exactly `last_column` cells they are decoded in
/// order. Otherwise every cell is placed by its coordinate and untouched slots
/// stay empty. Cells past `last_column` widen the result instead of being
/// dropped; cells without a coordinate take the slot after the previous cell.
pub fn normalize_row(row: &Row, last_column: usize, decoder: &CellDecoder<'_>) -> Result<Vec<String>> {
    if row.cells.len() == last_column {
        return row.cells.iter().map(|cell| decoder.decode(cell)).collect();
    }

    let mut dense = vec![String::new(); last_column];
    let mut next = 0usize;
    for cell in &row.cells {
        let index = match cell.column_index() {
            Some(index) => index? as usize,
            None => next,
        };
        if index >= dense.len() {
            dense.resize(index + 1, String::new());
        }
        dense[index] = decoder.decode(cell)?;
        next = index + 1;
    }
    Ok(dense)
}
