//! Parsing of workbook and worksheet parts
//!
//! Worksheet rows are parsed with a forward-only `quick-xml` cursor. The same
//! row parser serves the buffered loader (which walks every row up front) and
//! the streaming source (which stops after each row).

use crate::error::{ExcelError, Result};
use crate::fast_writer::shared_strings::decode_excel_escapes;
use crate::package::{self, Package};
use crate::types::{Cell, CellDataType, ColumnWidth, Row};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::io::BufRead;

/// A sheet declared in `xl/workbook.xml`
#[derive(Debug, Clone, PartialEq)]
pub struct SheetEntry {
    pub name: String,
    pub sheet_id: u32,
    /// Resolved part path, e.g. `xl/worksheets/sheet1.xml`
    pub part: String,
}

fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// List the sheets of a workbook in declaration order
pub fn read_sheet_entries(package: &Package) -> Result<Vec<SheetEntry>> {
    parse_sheet_entries(
        package.require_part(package::WORKBOOK)?,
        package.require_part(package::WORKBOOK_RELS)?,
    )
}

/// List the sheets declared by `xl/workbook.xml`, resolving each through the
/// workbook relationships
pub fn parse_sheet_entries(workbook: &[u8], relationships: &[u8]) -> Result<Vec<SheetEntry>> {
    let targets = read_relationships(relationships)?;

    let mut reader = Reader::from_reader(workbook);
    let mut entries = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_value(&e, b"name")?.unwrap_or_default();
                let sheet_id = attr_value(&e, b"sheetId")?
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(entries.len() as u32 + 1);
                // r:id is the only namespaced "id" on <sheet>
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == b"id")
                    .map(|a| a.unescape_value().map(|v| v.into_owned()))
                    .transpose()?;

                let part = rel_id
                    .as_ref()
                    .and_then(|id| targets.get(id))
                    .map(|target| package::resolve_target(target))
                    .ok_or_else(|| {
                        ExcelError::ReadError(format!(
                            "sheet '{}' has no worksheet relationship",
                            name
                        ))
                    })?;

                entries.push(SheetEntry {
                    name,
                    sheet_id,
                    part,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(entries)
}

/// Map relationship ids to their targets
pub fn read_relationships(xml: &[u8]) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attr_value(&e, b"Id")?, attr_value(&e, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// Row number of a `<row>` start tag, defaulting to the row after `previous`
pub(crate) fn row_index(e: &BytesStart<'_>, previous: u32) -> Result<u32> {
    Ok(attr_value(e, b"r")?
        .and_then(|r| r.parse::<u32>().ok())
        .unwrap_or(previous + 1))
}

fn cell_from_start(e: &BytesStart<'_>) -> Result<Cell> {
    let mut cell = Cell::default();
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.local_name().as_ref() {
            b"r" => cell.reference = Some(attr.unescape_value()?.into_owned()),
            b"t" => cell.data_type = CellDataType::from_attr(&attr.unescape_value()?),
            b"s" => cell.style = attr.unescape_value()?.parse().ok(),
            _ => {}
        }
    }
    Ok(cell)
}

/// Read the body of a `<row>` whose start tag was just consumed.
///
/// Stops after the matching `</row>`. Self-closing rows have no body and must
/// not be passed here.
pub(crate) fn read_row_body<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    index: u32,
) -> Result<Row> {
    let mut row = Row::new(index, Vec::new());
    let mut current: Option<Cell> = None;
    let mut text = String::new();
    let mut in_value = false;
    let mut in_inline = false;
    let mut in_phonetic = false;

    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"c" => {
                    current = Some(cell_from_start(&e)?);
                    text.clear();
                }
                b"v" => in_value = true,
                b"is" => in_inline = true,
                b"rPh" => in_phonetic = true,
                b"t" if in_inline && !in_phonetic => in_value = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                row.cells.push(cell_from_start(&e)?);
            }
            Event::Text(e) if in_value => text.push_str(&e.unescape()?),
            Event::CData(e) if in_value => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()))
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"is" => in_inline = false,
                b"rPh" => in_phonetic = false,
                b"c" => {
                    if let Some(mut cell) = current.take() {
                        if cell.data_type == CellDataType::InlineString {
                            cell.value = Some(decode_excel_escapes(&text));
                            text.clear();
                        } else if !text.is_empty() {
                            cell.value = Some(std::mem::take(&mut text));
                        }
                        row.cells.push(cell);
                    }
                }
                b"row" => return Ok(row),
                _ => {}
            },
            Event::Eof => {
                return Err(ExcelError::ReadError(format!(
                    "worksheet ended inside row {}",
                    index
                )))
            }
            _ => {}
        }
    }
}

fn column_from_start(e: &BytesStart<'_>) -> Result<Option<ColumnWidth>> {
    let min = attr_value(e, b"min")?.and_then(|v| v.parse().ok());
    let max = attr_value(e, b"max")?.and_then(|v| v.parse().ok());
    let width = attr_value(e, b"width")?.and_then(|v| v.parse().ok());
    Ok(match (min, max, width) {
        (Some(min), Some(max), Some(width)) => Some(ColumnWidth { min, max, width }),
        _ => None,
    })
}

/// Fully materialized worksheet content
#[derive(Debug, Clone, Default)]
pub struct SheetContent {
    pub columns: Vec<ColumnWidth>,
    /// Rows ordered by row number
    pub rows: Vec<Row>,
}

/// Load every row (and declared column width) of a worksheet part.
///
/// Rows come back sorted by number; of two rows sharing a number the first
/// stored one is kept.
pub fn load_sheet<R: BufRead>(xml: R) -> Result<SheetContent> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut content = SheetContent::default();
    let mut previous = 0;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"row" => {
                let index = row_index(&e, previous)?;
                let mut row_buf = Vec::new();
                let row = read_row_body(&mut reader, &mut row_buf, index)?;
                previous = index;
                content.rows.push(row);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                previous = row_index(&e, previous)?;
                content.rows.push(Row::new(previous, Vec::new()));
            }
            Event::Empty(e) | Event::Start(e) if e.local_name().as_ref() == b"col" => {
                if let Some(column) = column_from_start(&e)? {
                    content.columns.push(column);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    content.rows.sort_by_key(|r| r.index);
    content.rows.dedup_by_key(|r| r.index);
    Ok(content)
}

/// Extent of a worksheet as found by [`scan_dimensions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetDimensions {
    /// Highest row number
    pub rows: u32,
    /// Width of the widest row
    pub columns: u32,
    /// Every row number is higher than the one stored before it
    pub ascending: bool,
}

/// Measure a worksheet without keeping any values
pub fn scan_dimensions<R: BufRead>(reader: &mut Reader<R>) -> Result<SheetDimensions> {
    let mut buf = Vec::new();
    let mut last_row = 0;
    let mut last_column = 0;
    let mut previous = 0;
    let mut ascending = true;
    let mut position = 0u32;
    let mut row_width = 0u32;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                let index = row_index(&e, previous)?;
                if index <= previous {
                    ascending = false;
                }
                previous = index;
                last_row = last_row.max(index);
                position = 0;
                row_width = 0;
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let column = match attr_value(&e, b"r")? {
                    Some(r) => crate::coordinate::column_number(&r)?,
                    None => row_width.max(position) + 1,
                };
                position += 1;
                row_width = row_width.max(column);
                last_column = last_column.max(row_width);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(SheetDimensions {
        rows: last_row,
        columns: last_column,
        ascending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &[u8] = br#"<?xml version="1.0"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<cols><col min="1" max="1" width="12" customWidth="1"/></cols>
<sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s" s="1"><v>1</v></c></row>
<row r="3"><c r="A3"><v>42</v></c><c r="C3" t="inlineStr"><is><t>inline &amp; text_x000B_</t></is></c><c r="D3"/></row>
</sheetData>
</worksheet>"#;

    #[test]
    fn test_load_sheet() {
        let content = load_sheet(SHEET).unwrap();
        assert_eq!(content.columns.len(), 1);
        assert_eq!(content.columns[0].width, 12.0);
        assert_eq!(content.rows.len(), 2);

        let header = &content.rows[0];
        assert_eq!(header.index, 1);
        assert_eq!(header.cells[1].data_type, CellDataType::SharedString);
        assert_eq!(header.cells[1].style, Some(1));

        let data = &content.rows[1];
        assert_eq!(data.index, 3);
        assert_eq!(data.cells[0].value.as_deref(), Some("42"));
        assert_eq!(data.cells[1].value.as_deref(), Some("inline & text\u{b}"));
        assert_eq!(data.cells[2].value, None);
    }

    #[test]
    fn test_scan_dimensions() {
        let mut reader = Reader::from_reader(SHEET);
        assert_eq!(
            scan_dimensions(&mut reader).unwrap(),
            SheetDimensions {
                rows: 3,
                columns: 4,
                ascending: true
            }
        );
    }

    #[test]
    fn test_rows_stored_out_of_order() {
        let xml: &[u8] = br#"<sheetData>
<row r="3"><c r="A3"><v>3</v></c></row>
<row r="1"><c r="A1"><v>1</v></c></row>
<row r="3"><c r="A3"><v>duplicate</v></c></row>
</sheetData>"#;
        let dimensions = scan_dimensions(&mut Reader::from_reader(xml)).unwrap();
        assert!(!dimensions.ascending);
        assert_eq!(dimensions.rows, 3);

        let content = load_sheet(xml).unwrap();
        let indices: Vec<u32> = content.rows.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert_eq!(content.rows[1].cells[0].value.as_deref(), Some("3"));
    }

    #[test]
    fn test_column_past_last_sheet_column() {
        let xml: &[u8] = br#"<sheetData><row r="1"><c r="ZZZZZZ1"><v>1</v></c></row></sheetData>"#;
        assert!(matches!(
            scan_dimensions(&mut Reader::from_reader(xml)),
            Err(ExcelError::InvalidCell(_))
        ));
    }

    #[test]
    fn test_rows_without_numbers() {
        let xml: &[u8] = b"<sheetData><row><c><v>1</v></c></row><row><c><v>2</v></c><c><v>3</v></c></row></sheetData>";
        let content = load_sheet(xml).unwrap();
        assert_eq!(content.rows[1].index, 2);
        assert_eq!(content.rows[1].cells.len(), 2);

        let mut reader = Reader::from_reader(xml);
        let dimensions = scan_dimensions(&mut reader).unwrap();
        assert_eq!((dimensions.rows, dimensions.columns), (2, 2));
        assert!(dimensions.ascending);
    }

    #[test]
    fn test_truncated_row_is_an_error() {
        assert!(load_sheet(&b"<sheetData><row r=\"1\"><c r=\"A1\"><v>1</v></c>"[..]).is_err());
    }

    #[test]
    fn test_sheet_entries() {
        let mut package = Package::new();
        package.put_part(
            package::WORKBOOK,
            br#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="People" sheetId="4" r:id="rId2"/></sheets></workbook>"#.to_vec(),
        );
        package.put_part(
            package::WORKBOOK_RELS,
            br#"<Relationships><Relationship Id="rId2" Type="worksheet" Target="worksheets/sheet9.xml"/></Relationships>"#.to_vec(),
        );

        let entries = read_sheet_entries(&package).unwrap();
        assert_eq!(
            entries,
            vec![SheetEntry {
                name: "People".to_string(),
                sheet_id: 4,
                part: "xl/worksheets/sheet9.xml".to_string(),
            }]
        );
    }
}
