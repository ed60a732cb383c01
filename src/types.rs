//! Cell-level worksheet model shared by the read and write paths

use crate::coordinate;
use crate::error::Result;
use crate::styles::CellStyle;

/// How the value slot of a cell must be interpreted (`t` attribute)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellDataType {
    /// No `t` attribute: a number, or text for foreign producers
    #[default]
    Plain,
    /// `t="s"`: the value is an index into the shared string table
    SharedString,
    /// `t="b"`: `0` or `1`
    Boolean,
    /// `t="d"`: a date serial
    DateSerial,
    /// `t="inlineStr"`: text stored in the cell itself
    InlineString,
    /// `t="str"`: cached text result of a formula
    FormulaString,
    /// `t="e"`: an error literal such as `#N/A`
    Error,
}

impl CellDataType {
    /// Parse the `t` attribute of a `<c>` element
    pub fn from_attr(value: &str) -> Self {
        match value {
            "s" => CellDataType::SharedString,
            "b" => CellDataType::Boolean,
            "d" => CellDataType::DateSerial,
            "inlineStr" => CellDataType::InlineString,
            "str" => CellDataType::FormulaString,
            "e" => CellDataType::Error,
            _ => CellDataType::Plain,
        }
    }

    /// Value of the `t` attribute, `None` for plain cells
    pub fn as_attr(&self) -> Option<&'static str> {
        match self {
            CellDataType::Plain => None,
            CellDataType::SharedString => Some("s"),
            CellDataType::Boolean => Some("b"),
            CellDataType::DateSerial => Some("d"),
            CellDataType::InlineString => Some("inlineStr"),
            CellDataType::FormulaString => Some("str"),
            CellDataType::Error => Some("e"),
        }
    }
}

/// One grid position
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    /// Coordinate such as `"B4"`; foreign producers may omit it
    pub reference: Option<String>,
    /// Raw value slot (`<v>` or inline `<t>` text)
    pub value: Option<String>,
    pub data_type: CellDataType,
    /// Index into the workbook's `cellXfs`
    pub style: Option<u32>,
}

impl Cell {
    pub fn new(reference: impl Into<String>, value: impl Into<String>, data_type: CellDataType) -> Self {
        Cell {
            reference: Some(reference.into()),
            value: Some(value.into()),
            data_type,
            style: None,
        }
    }

    pub fn with_style(mut self, style: Option<CellStyle>) -> Self {
        self.style = style.map(|s| s.index());
        self
    }

    /// Zero-based column index taken from the coordinate
    pub fn column_index(&self) -> Option<Result<u32>> {
        self.reference
            .as_deref()
            .map(|r| coordinate::column_number(r).map(|n| n - 1))
    }
}

/// Ordered, possibly sparse, collection of cells
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    /// Row number (1-based)
    pub index: u32,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(index: u32, cells: Vec<Cell>) -> Self {
        Row { index, cells }
    }

    /// Number of physically present cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Width of the row: the highest one-based column it touches
    pub fn width(&self) -> u32 {
        let mut width = 0;
        for (position, cell) in self.cells.iter().enumerate() {
            let column = match cell.column_index() {
                Some(Ok(index)) => index + 1,
                _ => width.max(position as u32) + 1,
            };
            width = width.max(column);
        }
        width
    }
}

/// Explicit width declared for a range of columns (`<col>`)
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnWidth {
    /// First column (1-based, inclusive)
    pub min: u32,
    /// Last column (1-based, inclusive)
    pub max: u32,
    pub width: f64,
}

/// Named container of rows
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    /// `sheetId` in workbook.xml
    pub sheet_id: u32,
    pub columns: Vec<ColumnWidth>,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, sheet_id: u32) -> Self {
        Sheet {
            name: name.into(),
            sheet_id,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Highest populated row number
    pub fn last_row(&self) -> u32 {
        self.rows.iter().map(|r| r.index).max().unwrap_or(0)
    }

    /// Width of the widest row
    pub fn last_column(&self) -> u32 {
        self.rows.iter().map(Row::width).max().unwrap_or(0)
    }

    /// Row with the given 1-based number, if present
    pub fn row(&self, index: u32) -> Option<&Row> {
        self.rows
            .binary_search_by_key(&index, |r| r.index)
            .ok()
            .map(|pos| &self.rows[pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_attr_round_trip() {
        for t in ["s", "b", "d", "inlineStr", "str", "e"] {
            assert_eq!(CellDataType::from_attr(t).as_attr(), Some(t));
        }
        assert_eq!(CellDataType::from_attr("n"), CellDataType::Plain);
        assert_eq!(CellDataType::Plain.as_attr(), None);
    }

    #[test]
    fn test_row_width_uses_coordinates() {
        let row = Row::new(
            3,
            vec![
                Cell::new("A3", "x", CellDataType::Plain),
                Cell::new("D3", "y", CellDataType::Plain),
            ],
        );
        assert_eq!(row.len(), 2);
        assert_eq!(row.width(), 4);
    }

    #[test]
    fn test_row_width_without_coordinates() {
        let cell = Cell {
            value: Some("1".to_string()),
            ..Cell::default()
        };
        let row = Row::new(1, vec![cell.clone(), cell]);
        assert_eq!(row.width(), 2);
    }

    #[test]
    fn test_sheet_bounds() {
        let mut sheet = Sheet::new("Data", 1);
        assert_eq!(sheet.last_row(), 0);
        sheet.rows.push(Row::new(1, vec![Cell::new("C1", "h", CellDataType::SharedString)]));
        sheet.rows.push(Row::new(4, vec![Cell::new("A4", "1", CellDataType::Plain)]));
        assert_eq!(sheet.last_row(), 4);
        assert_eq!(sheet.last_column(), 3);
        assert!(sheet.row(4).is_some());
        assert!(sheet.row(2).is_none());
    }

    #[test]
    fn test_cell_style() {
        let cell = Cell::new("A1", "1", CellDataType::Plain).with_style(Some(CellStyle::DateDefault));
        assert_eq!(cell.style, Some(13));
        assert_eq!(cell.column_index().unwrap().unwrap(), 0);
    }
}
