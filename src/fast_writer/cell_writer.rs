//! Type-directed cell encoding
//!
//! Every value reaches the writer already rendered to a string. The declared
//! [`FieldType`] of its column picks the native representation (inline number,
//! boolean, shared string) and the style the cell is stamped with.

use super::shared_strings::SharedStrings;
use crate::coordinate;
use crate::culture::Culture;
use crate::error::{ExcelError, Result};
use crate::record::{self, FieldDescriptor, FieldType};
use crate::styles::CellStyle;
use crate::types::{Cell, CellDataType};

/// Per-column state of the sheet being written
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFormat {
    pub field_type: FieldType,
    /// Explicit style override declared by the field
    pub style: Option<CellStyle>,
    /// Longest rendered value seen so far, in characters
    pub max_len: usize,
}

impl ColumnFormat {
    pub fn new(field_type: FieldType, style: Option<CellStyle>) -> Self {
        ColumnFormat {
            field_type,
            style,
            max_len: 0,
        }
    }

    /// Style data cells of this column receive
    pub fn effective_style(&self) -> Option<CellStyle> {
        self.style.or_else(|| self.field_type.default_style())
    }

    fn observe(&mut self, value: &str) {
        self.max_len = self.max_len.max(value.chars().count());
    }
}

impl From<&FieldDescriptor> for ColumnFormat {
    fn from(field: &FieldDescriptor) -> Self {
        ColumnFormat::new(field.field_type, field.style)
    }
}

/// Encodes rendered values into cells for one sheet
///
/// Borrows the workbook's string table and the sheet session's column
/// metadata for the duration of a batch.
pub struct CellWriter<'a> {
    shared_strings: &'a mut SharedStrings,
    columns: &'a mut Vec<ColumnFormat>,
    culture: &'a Culture,
}

impl<'a> CellWriter<'a> {
    pub fn new(
        shared_strings: &'a mut SharedStrings,
        columns: &'a mut Vec<ColumnFormat>,
        culture: &'a Culture,
    ) -> Self {
        CellWriter {
            shared_strings,
            columns,
            culture,
        }
    }

    /// Encode a header cell: always a bold, centered shared string
    pub fn write_header(&mut self, row: u32, column: u32, name: &str) -> Cell {
        if let Some(format) = self.columns.get_mut(column as usize) {
            format.observe(name);
        }
        self.shared_string_cell(row, column, name)
            .with_style(Some(CellStyle::HeaderBoldCentered))
    }

    /// Encode one data value of `column` (zero-based) in `row` (one-based).
    ///
    /// Returns `None` for an empty value: no cell is created, but the caller
    /// still moves on to the next column. A column without metadata is written
    /// as plain text with no style; it is tracked from then on so autofit can
    /// size it.
    pub fn write(&mut self, row: u32, column: u32, value: &str) -> Result<Option<Cell>> {
        if value.is_empty() {
            return Ok(None);
        }

        if column >= coordinate::MAX_COLUMNS {
            return Err(ExcelError::InvalidCell(format!(
                "column {} is past the last sheet column",
                column + 1
            )));
        }
        let position = column as usize;
        if position >= self.columns.len() {
            self.columns
                .resize(position + 1, ColumnFormat::new(FieldType::Text, None));
        }
        let format = &mut self.columns[position];
        format.observe(value);
        let field_type = format.field_type;
        let style = format.effective_style();

        let cell = match field_type {
            FieldType::Text => self.text_cell(row, column, value),
            FieldType::Date | FieldType::Time | FieldType::DateTime => {
                if self.parses_as(field_type, value) {
                    self.shared_string_cell(row, column, value)
                } else {
                    self.number_cell(row, column, self.serial_literal(value)?)
                }
            }
            FieldType::Int32 => {
                let number = value.trim().parse::<i32>().map_err(|_| {
                    ExcelError::InvalidFormat(format!("'{}' is not a 32-bit integer", value))
                })?;
                self.number_cell(row, column, number.to_string())
            }
            FieldType::Decimal => {
                let number = self.culture.parse_decimal(value)?;
                self.number_cell(row, column, number.normalize().to_string())
            }
            FieldType::Double => {
                let number = self.culture.parse_f64(value)?;
                if !number.is_finite() {
                    return Err(ExcelError::InvalidFormat(format!(
                        "'{}' is not a finite number",
                        value
                    )));
                }
                self.number_cell(row, column, number.to_string())
            }
            FieldType::Boolean => {
                let flag = if record::parse_bool(value)? { "1" } else { "0" };
                Cell::new(coordinate::cell_reference(column, row), flag, CellDataType::Boolean)
            }
        };

        Ok(Some(cell.with_style(style)))
    }

    fn parses_as(&self, field_type: FieldType, value: &str) -> bool {
        match field_type {
            FieldType::Date => self.culture.parse_date(value).is_some(),
            FieldType::Time => self.culture.parse_time(value).is_some(),
            _ => {
                self.culture.parse_datetime(value).is_some()
                    || self.culture.parse_date(value).is_some()
            }
        }
    }

    /// Day-count text written by the record layer, validated as a number
    fn serial_literal(&self, value: &str) -> Result<String> {
        let serial = value
            .trim()
            .parse::<f64>()
            .or_else(|_| self.culture.parse_f64(value))?;
        if !serial.is_finite() {
            return Err(ExcelError::InvalidFormat(format!(
                "'{}' is not a date serial",
                value
            )));
        }
        Ok(serial.to_string())
    }

    /// Whole numbers are stored inline, everything else goes to the string table
    fn text_cell(&mut self, row: u32, column: u32, value: &str) -> Cell {
        match value.parse::<i32>() {
            Ok(number) => self.number_cell(row, column, number.to_string()),
            Err(_) => self.shared_string_cell(row, column, value),
        }
    }

    fn shared_string_cell(&mut self, row: u32, column: u32, value: &str) -> Cell {
        let index = self.shared_strings.intern(value);
        Cell::new(
            coordinate::cell_reference(column, row),
            index.to_string(),
            CellDataType::SharedString,
        )
    }

    fn number_cell(&self, row: u32, column: u32, literal: String) -> Cell {
        Cell::new(coordinate::cell_reference(column, row), literal, CellDataType::Plain)
    }
}
