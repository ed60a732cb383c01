//! Streaming row source over a worksheet part
//!
//! **Memory Usage:**
//! - Shared Strings Table (SST): loaded fully by the owning reader
//! - Worksheet XML: inflated from the archive through a fixed-size buffer
//! - Rows: only the current row is materialized
//!
//! The sheet part is opened twice. A first pass over row and cell start tags
//! finds the row count, the widest row and whether rows are stored in
//! ascending order, without keeping any values. The second pass decodes one
//! `<row>` per [`RowSource::read`]. A part storing its rows out of order
//! cannot be served by a forward cursor; it is loaded and sorted instead.

use crate::culture::Culture;
use crate::decode::{normalize_row, CellDecoder};
use crate::error::{ExcelError, Result};
use crate::package::{PackageReader, PartReader};
use crate::reader::RowSource;
use crate::sheet_xml::{load_sheet, read_row_body, row_index, scan_dimensions};
use crate::types::Row;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::{Read, Seek};

/// Where stored rows come from
enum RowFeed<'a> {
    /// Forward cursor over a part whose rows are in ascending order
    Cursor {
        reader: Reader<PartReader<'a>>,
        buf: Vec<u8>,
        row_buf: Vec<u8>,
        /// Last row number seen in the part
        previous: u32,
    },
    /// Rows of an unordered part, sorted by number
    Sorted(std::vec::IntoIter<Row>),
    Released,
}

impl RowFeed<'_> {
    fn next_row(&mut self) -> Result<Option<Row>> {
        match self {
            RowFeed::Cursor {
                reader,
                buf,
                row_buf,
                previous,
            } => loop {
                buf.clear();
                let row = match reader.read_event_into(buf)? {
                    Event::Start(e) if e.local_name().as_ref() == b"row" => {
                        let index = row_index(&e, *previous)?;
                        read_row_body(reader, row_buf, index)?
                    }
                    Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                        Row::new(row_index(&e, *previous)?, Vec::new())
                    }
                    Event::Eof => return Ok(None),
                    _ => continue,
                };
                *previous = row.index;
                return Ok(Some(row));
            },
            RowFeed::Sorted(rows) => Ok(rows.next()),
            RowFeed::Released => Ok(None),
        }
    }
}

/// Row source decoding one worksheet row at a time
pub struct StreamingRowSource<'a> {
    sheet_name: String,
    feed: RowFeed<'a>,
    decoder: CellDecoder<'a>,
    row_count: u32,
    column_count: u32,
    row: u32,
    /// Stored row read ahead of the cursor while yielding a gap
    pending: Option<Row>,
    record: Vec<String>,
    closed: bool,
}

impl<'a> StreamingRowSource<'a> {
    /// Measure the sheet stored in `part`, then position a cursor before its
    /// first row
    pub(crate) fn open<R: Read + Seek>(
        sheet_name: String,
        part: &str,
        package: &'a mut PackageReader<R>,
        decoder: CellDecoder<'a>,
    ) -> Result<Self> {
        let dimensions = scan_dimensions(&mut Reader::from_reader(package.stream_part(part)?))?;
        log::debug!(
            "sheet '{}': {} rows, {} columns",
            sheet_name,
            dimensions.rows,
            dimensions.columns
        );

        let feed = if dimensions.ascending {
            RowFeed::Cursor {
                reader: Reader::from_reader(package.stream_part(part)?),
                buf: Vec::with_capacity(1024),
                row_buf: Vec::with_capacity(4096),
                previous: 0,
            }
        } else {
            log::warn!(
                "sheet '{}' stores rows out of order; loading it whole",
                sheet_name
            );
            RowFeed::Sorted(load_sheet(package.stream_part(part)?)?.rows.into_iter())
        };

        Ok(StreamingRowSource {
            sheet_name,
            feed,
            decoder,
            row_count: dimensions.rows,
            column_count: dimensions.columns,
            row: 0,
            pending: None,
            record: Vec::new(),
            closed: false,
        })
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Culture the source renders date serials with
    pub(crate) fn culture(&self) -> &'a Culture {
        self.decoder.culture()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ExcelError::Released("row source"));
        }
        Ok(())
    }

    /// Next stored row numbered `min_index` or higher
    fn next_stored_row(&mut self, min_index: u32) -> Result<Option<Row>> {
        while let Some(row) = self.feed.next_row()? {
            if row.index >= min_index {
                return Ok(Some(row));
            }
            log::debug!(
                "sheet '{}': skipping repeated row {}",
                self.sheet_name,
                row.index
            );
        }
        Ok(None)
    }
}

impl RowSource for StreamingRowSource<'_> {
    fn row_count(&self) -> Result<u32> {
        self.ensure_open()?;
        Ok(self.row_count)
    }

    fn column_count(&self) -> Result<u32> {
        self.ensure_open()?;
        Ok(self.column_count)
    }

    fn row(&self) -> u32 {
        self.row
    }

    fn raw_row(&self) -> u32 {
        self.row
    }

    fn read(&mut self) -> Result<bool> {
        self.ensure_open()?;
        if self.row >= self.row_count {
            self.record.clear();
            return Ok(false);
        }

        let next = self.row + 1;
        let width = self.column_count as usize;
        let stored = match self.pending.take() {
            Some(row) => Some(row),
            None => self.next_stored_row(next)?,
        };

        self.record = match stored {
            Some(row) if row.index == next => normalize_row(&row, width, &self.decoder)?,
            Some(row) => {
                self.pending = Some(row);
                vec![String::new(); width]
            }
            None => vec![String::new(); width],
        };
        self.row = next;
        Ok(true)
    }

    fn current_record(&self) -> Result<&[String]> {
        self.ensure_open()?;
        Ok(&self.record)
    }

    fn close(&mut self) {
        self.pending = None;
        self.record = Vec::new();
        self.feed = RowFeed::Released;
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fast_writer::shared_strings::SharedStrings;
    use crate::package::{self, Package};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    const PART: &str = "xl/worksheets/sheet1.xml";

    const SHEET: &[u8] = br#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
<row r="2"><c r="A2"><v>1</v></c></row>
<row r="4"><c r="A4"><v>2</v></c><c r="B4"><v>3</v></c><c r="D4" t="b"><v>1</v></c></row>
</sheetData></worksheet>"#;

    fn strings() -> SharedStrings {
        let mut ss = SharedStrings::new();
        ss.intern("Id");
        ss.intern("Value");
        ss
    }

    fn archive(sheet: &[u8]) -> PackageReader<Cursor<Vec<u8>>> {
        let mut package = Package::new();
        package.put_part(package::CONTENT_TYPES, b"<Types/>".to_vec());
        package.put_part(PART, sheet.to_vec());
        let bytes = package.save(Cursor::new(Vec::new())).unwrap().into_inner();
        PackageReader::open(Cursor::new(bytes)).unwrap()
    }

    fn read_all(source: &mut StreamingRowSource<'_>) -> Vec<Vec<String>> {
        let mut records = Vec::new();
        while source.read().unwrap() {
            records.push(source.current_record().unwrap().to_vec());
        }
        records
    }

    #[test]
    fn test_streaming_rows() {
        let ss = strings();
        let culture = Culture::invariant();
        let decoder = CellDecoder::new(Some(&ss), &culture, false);
        let mut package = archive(SHEET);
        let mut source =
            StreamingRowSource::open("Data".to_string(), PART, &mut package, decoder).unwrap();

        assert_eq!(source.row_count().unwrap(), 4);
        // a data row wider than the header widens every record
        assert_eq!(source.column_count().unwrap(), 4);

        assert_eq!(
            read_all(&mut source),
            vec![
                vec!["Id", "Value", "", ""],
                vec!["1", "", "", ""],
                vec!["", "", "", ""],
                vec!["2", "3", "", "TRUE"],
            ]
        );
        assert_eq!(source.row(), 4);
        assert!(!source.read().unwrap());
    }

    #[test]
    fn test_rows_stored_out_of_order() {
        let culture = Culture::invariant();
        let decoder = CellDecoder::new(None, &culture, false);
        let mut package = archive(
            br#"<worksheet><sheetData>
<row r="3"><c r="A3"><v>30</v></c></row>
<row r="1"><c r="A1"><v>10</v></c><c r="B1"><v>11</v></c></row>
<row r="2"><c r="A2"><v>20</v></c></row>
</sheetData></worksheet>"#,
        );
        let mut source =
            StreamingRowSource::open("Data".to_string(), PART, &mut package, decoder).unwrap();

        assert_eq!(
            read_all(&mut source),
            vec![vec!["10", "11"], vec!["20", ""], vec!["30", ""]]
        );
    }

    #[test]
    fn test_streaming_released() {
        let culture = Culture::invariant();
        let decoder = CellDecoder::new(None, &culture, false);
        let mut package = archive(SHEET);
        let mut source =
            StreamingRowSource::open("Data".to_string(), PART, &mut package, decoder).unwrap();
        assert!(source.read().unwrap());
        source.close();

        assert!(matches!(source.read(), Err(ExcelError::Released(_))));
        assert!(matches!(source.current_record(), Err(ExcelError::Released(_))));
    }

    #[test]
    fn test_empty_sheet() {
        let culture = Culture::invariant();
        let decoder = CellDecoder::new(None, &culture, false);
        let mut package = archive(b"<worksheet><sheetData/></worksheet>");
        let mut source =
            StreamingRowSource::open("Empty".to_string(), PART, &mut package, decoder).unwrap();
        assert_eq!(source.row_count().unwrap(), 0);
        assert!(!source.read().unwrap());
    }

    #[test]
    fn test_missing_part() {
        let culture = Culture::invariant();
        let decoder = CellDecoder::new(None, &culture, false);
        let mut package = archive(SHEET);
        assert!(matches!(
            StreamingRowSource::open("Gone".to_string(), "xl/worksheets/sheet7.xml", &mut package, decoder),
            Err(ExcelError::ReadError(_))
        ));
    }
}
