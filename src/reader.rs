//! Excel file reading into dense string records
//!
//! [`ExcelReader`] opens a package and hands out row sources for its sheets.
//! Both strategies implement [`RowSource`] and yield exactly the same records:
//! [`BufferedRowSource`] materializes every row up front, while
//! [`StreamingRowSource`](crate::streaming_reader::StreamingRowSource) decodes
//! one row per read from a forward cursor over the sheet part.
//!
//! Opening a reader inflates only the workbook, its relationships and the
//! shared string table. Worksheet parts stay compressed in the archive until a
//! row source asks for them.

use crate::culture::Culture;
use crate::decode::{normalize_row, CellDecoder};
use crate::error::{ExcelError, Result};
use crate::fast_writer::shared_strings::SharedStrings;
use crate::package::{self, PackageReader};
use crate::record::FromRecord;
use crate::sheet_xml::{self, SheetEntry};
use crate::streaming_reader::StreamingRowSource;
use crate::types::Sheet;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::marker::PhantomData;
use std::path::Path;

/// Options controlling how cell values are decoded
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReaderOptions {
    culture: Culture,
    trim: bool,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Culture used to render date serial cells
    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = culture;
        self
    }

    /// Trim surrounding whitespace from plain cell values
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn culture(&self) -> &Culture {
        &self.culture
    }

    pub fn trim(&self) -> bool {
        self.trim
    }
}

/// Cursor over the dense records of one sheet
///
/// `row()` and `raw_row()` start at 0 and advance together on every successful
/// [`read`](RowSource::read). Once the source is closed every access fails with
/// [`ExcelError::Released`].
#[allow(async_fn_in_trait)]
pub trait RowSource {
    /// Highest populated row number
    fn row_count(&self) -> Result<u32>;

    /// Width of the widest row
    fn column_count(&self) -> Result<u32>;

    /// Row number of the current record
    fn row(&self) -> u32;

    /// Physical row number of the current record
    fn raw_row(&self) -> u32;

    /// Advance to the next row; `false` once past the last row
    fn read(&mut self) -> Result<bool>;

    /// Async form of [`RowSource::read`]; completes without yielding
    async fn read_async(&mut self) -> Result<bool> {
        self.read()
    }

    /// Dense values of the current row
    fn current_record(&self) -> Result<&[String]>;

    /// Value at a zero-based column of the current row, `""` when missing
    fn get(&self, index: usize) -> Result<&str> {
        Ok(self
            .current_record()?
            .get(index)
            .map(String::as_str)
            .unwrap_or(""))
    }

    /// Release the sheet data
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Excel file reader
///
/// Row sources borrow the reader mutably, as each one reads its sheet straight
/// from the archive. Open one source at a time per reader.
///
/// # Examples
///
/// ```no_run
/// use excelbind::reader::{ExcelReader, RowSource};
///
/// let mut reader = ExcelReader::open("data.xlsx")?;
/// let mut rows = reader.buffered(None)?;
/// while rows.read()? {
///     println!("{}: {:?}", rows.row(), rows.current_record()?);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ExcelReader<R: Read + Seek = BufReader<File>> {
    package: PackageReader<R>,
    sheets: Vec<SheetEntry>,
    shared_strings: Option<SharedStrings>,
    options: ReaderOptions,
}

impl ExcelReader {
    /// Open an xlsx file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ReaderOptions) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), options)
    }
}

impl<R: Read + Seek> ExcelReader<R> {
    /// Read a workbook from any seekable byte source
    pub fn from_reader(reader: R, options: ReaderOptions) -> Result<Self> {
        let mut package = PackageReader::open(reader)?;
        let sheets = sheet_xml::parse_sheet_entries(
            &package.require_part(package::WORKBOOK)?,
            &package.require_part(package::WORKBOOK_RELS)?,
        )?;
        let shared_strings = package
            .read_part(package::SHARED_STRINGS)?
            .map(|xml| SharedStrings::parse(&xml))
            .transpose()?;

        Ok(ExcelReader {
            package,
            sheets,
            shared_strings,
            options,
        })
    }

    /// Get list of sheet names in the workbook
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Get the number of sheets in the workbook
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Load a whole sheet and read it from memory.
    ///
    /// `None` selects the first sheet.
    pub fn buffered(&mut self, sheet: Option<&str>) -> Result<BufferedRowSource<'_>> {
        let entry = find_entry(&self.sheets, sheet)?;
        let content = sheet_xml::load_sheet(self.package.stream_part(&entry.part)?)?;

        let mut loaded = Sheet::new(entry.name.clone(), entry.sheet_id);
        loaded.columns = content.columns;
        loaded.rows = content.rows;
        let decoder = CellDecoder::new(
            self.shared_strings.as_ref(),
            &self.options.culture,
            self.options.trim,
        );
        Ok(BufferedRowSource::new(loaded, decoder))
    }

    /// Read a sheet one row at a time.
    ///
    /// `None` selects the first sheet.
    pub fn streaming(&mut self, sheet: Option<&str>) -> Result<StreamingRowSource<'_>> {
        let entry = find_entry(&self.sheets, sheet)?;
        let decoder = CellDecoder::new(
            self.shared_strings.as_ref(),
            &self.options.culture,
            self.options.trim,
        );
        StreamingRowSource::open(entry.name.clone(), &entry.part, &mut self.package, decoder)
    }

    /// Read typed records, skipping the header row
    ///
    /// Rows without any value are skipped.
    pub fn records<T: FromRecord>(&mut self, sheet: Option<&str>) -> Result<RecordIterator<'_, T>> {
        let mut source = self.streaming(sheet)?;
        // header
        source.read()?;
        Ok(RecordIterator {
            source,
            finished: false,
            _record: PhantomData,
        })
    }
}

fn find_entry<'s>(sheets: &'s [SheetEntry], sheet: Option<&str>) -> Result<&'s SheetEntry> {
    let found = match sheet {
        Some(name) => sheets.iter().find(|s| s.name == name),
        None => sheets.first(),
    };
    found.ok_or_else(|| ExcelError::SheetNotFound {
        sheet: sheet.unwrap_or("<first>").to_string(),
        available: sheets
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Row source over a fully loaded sheet
#[derive(Debug)]
pub struct BufferedRowSource<'a> {
    sheet: Sheet,
    decoder: CellDecoder<'a>,
    row_count: u32,
    column_count: u32,
    row: u32,
    record: Vec<String>,
    closed: bool,
}

impl<'a> BufferedRowSource<'a> {
    pub(crate) fn new(sheet: Sheet, decoder: CellDecoder<'a>) -> Self {
        let row_count = sheet.last_row();
        let column_count = sheet.last_column();
        BufferedRowSource {
            sheet,
            decoder,
            row_count,
            column_count,
            row: 0,
            record: Vec::new(),
            closed: false,
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet.name
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ExcelError::Released("row source"));
        }
        Ok(())
    }
}

impl RowSource for BufferedRowSource<'_> {
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
        self.record = match self.sheet.row(next) {
            Some(row) => normalize_row(row, width, &self.decoder)?,
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
        self.sheet.rows = Vec::new();
        self.record = Vec::new();
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Iterator of typed records read from one sheet
///
/// The first error ends the iteration.
pub struct RecordIterator<'a, T> {
    source: StreamingRowSource<'a>,
    finished: bool,
    _record: PhantomData<T>,
}

impl<T: FromRecord> Iterator for RecordIterator<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.source.read() {
                Ok(true) => match self.source.current_record() {
                    Ok(record) if record.iter().all(String::is_empty) => continue,
                    Ok(record) => return Some(T::from_row(record, self.source.culture())),
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                },
                Ok(false) => self.finished = true,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
