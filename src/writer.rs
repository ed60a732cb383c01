//! Record batch writing with sheet session management
//!
//! A [`RecordWriter`] owns its output storage for its whole life. Each batch
//! names the sheet it targets; a batch aimed at a different sheet than the
//! previous one starts a new sheet with its own header row and column metadata.
//! The workbook is kept in memory and serialized back to the storage on
//! [`RecordWriter::flush`], on [`RecordWriter::close`] and when the writer is
//! dropped.

use crate::culture::Culture;
use crate::error::{ExcelError, Result};
use crate::fast_writer::autofit::autofit;
use crate::fast_writer::cell_writer::{CellWriter, ColumnFormat};
use crate::fast_writer::workbook::Workbook;
use crate::package::Package;
use crate::record::{FieldDescriptor, Record};
use crate::types::Row;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Byte storage a workbook can be loaded from and saved back into
pub trait Storage: Read + Write + Seek {
    /// Cut the storage down to `len` bytes after a shorter save
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl Storage for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl Storage for Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.get_mut().truncate(len as usize);
        Ok(())
    }
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        (**self).truncate(len)
    }
}

/// State of the sheet currently being written
#[derive(Debug)]
struct SheetSession {
    /// Name the caller asked for; the actual sheet name may carry a suffix
    requested: String,
    /// Position of the sheet in the workbook
    sheet: usize,
    /// One past the last committed row
    next_row: u32,
    /// Widest row written so far
    width: usize,
    columns: Vec<ColumnFormat>,
}

/// Writes batches of records into an xlsx workbook
///
/// # Examples
///
/// ```no_run
/// use excelbind::record::{FieldDescriptor, FieldType};
/// use excelbind::writer::RecordWriter;
///
/// let mut writer = RecordWriter::create("people.xlsx")?;
/// let fields = vec![
///     FieldDescriptor::new("Name", FieldType::Text),
///     FieldDescriptor::new("Age", FieldType::Int32),
/// ];
/// writer.write_batch(&fields, [["Alice", "30"], ["Bob", "25"]], None)?;
/// writer.close()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RecordWriter<W: Storage> {
    storage: Option<W>,
    workbook: Workbook,
    culture: Culture,
    default_sheet_name: String,
    autofit: bool,
    session: Option<SheetSession>,
}

impl RecordWriter<File> {
    /// Create (or truncate) a workbook file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        RecordWriterBuilder::new().create(path)
    }

    /// Open a workbook file for appending new sheets, creating it if missing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        RecordWriterBuilder::new().open(path)
    }
}

impl<W: Storage> RecordWriter<W> {
    /// Wrap a storage with default settings.
    ///
    /// A non-empty storage must hold a workbook; its sheets and shared strings
    /// are kept and new sheets are appended after them.
    pub fn new(storage: W) -> Result<Self> {
        RecordWriterBuilder::new().build(storage)
    }

    /// Write one batch of rendered rows.
    ///
    /// `fields` declares the columns: it is written as the header row when the
    /// batch starts a new sheet, and decides the encoding of every value. `sheet`
    /// selects the target sheet; `None` continues the current sheet (or the
    /// default sheet before the first batch).
    ///
    /// A failing value aborts the batch at that row with
    /// [`ExcelError::WriteRowError`]; rows written before it are kept.
    pub fn write_batch<I, R, S>(
        &mut self,
        fields: &[FieldDescriptor],
        rows: I,
        sheet: Option<&str>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        self.ensure_open()?;

        let target = match (sheet, &self.session) {
            (Some(name), _) => name.to_string(),
            (None, Some(session)) => session.requested.clone(),
            (None, None) => self.default_sheet_name.clone(),
        };
        if target.chars().any(char::is_control) {
            return Err(ExcelError::WriteError(format!(
                "sheet name {:?} contains a control character",
                target
            )));
        }

        let mut session = match self.session.take() {
            Some(session) if session.requested == target => session,
            previous => {
                if let Some(previous) = previous {
                    log::debug!("switching from sheet '{}' to '{}'", previous.requested, target);
                }
                self.start_sheet(target, fields)?
            }
        };

        let result = write_rows(&mut self.workbook, &mut session, &self.culture, rows);
        if result.is_ok() && self.autofit && !session.columns.is_empty() {
            let widths = autofit(&session.columns, session.width);
            if let Some(sheet) = self.workbook.sheet_mut(session.sheet) {
                log::debug!("autofit {} columns of sheet '{}'", widths.len(), sheet.name);
                sheet.columns = widths;
            }
        }
        self.session = Some(session);
        result
    }

    /// Write typed records, using the record type's declared fields
    pub fn write_records<'r, T, I>(&mut self, records: I, sheet: Option<&str>) -> Result<()>
    where
        T: Record + 'r,
        I: IntoIterator<Item = &'r T>,
    {
        let fields = T::fields();
        let culture = self.culture.clone();
        self.write_batch(
            &fields,
            records.into_iter().map(|record| record.to_row(&culture)),
            sheet,
        )
    }

    /// Async form of [`RecordWriter::write_records`]; completes without yielding
    pub async fn write_records_async<'r, T, I>(&mut self, records: I, sheet: Option<&str>) -> Result<()>
    where
        T: Record + 'r,
        I: IntoIterator<Item = &'r T>,
    {
        self.write_records(records, sheet)
    }

    /// Serialize the workbook into the storage
    pub fn flush(&mut self) -> Result<()> {
        let storage = self.storage.as_mut().ok_or(ExcelError::Released("writer"))?;

        let bytes = if self.workbook.sheets().is_empty() {
            // a package needs at least one sheet
            let mut workbook = self.workbook.clone();
            workbook.add_sheet(&self.default_sheet_name);
            workbook.to_bytes()?
        } else {
            self.workbook.to_bytes()?
        };

        storage.seek(SeekFrom::Start(0))?;
        storage.write_all(&bytes)?;
        storage.truncate(bytes.len() as u64)?;
        storage.flush()?;

        log::debug!(
            "flushed {} sheets ({} bytes)",
            self.workbook.sheets().len(),
            bytes.len()
        );
        Ok(())
    }

    /// Async form of [`RecordWriter::flush`]; completes without yielding
    pub async fn flush_async(&mut self) -> Result<()> {
        self.flush()
    }

    /// Flush and release the storage; later calls fail with
    /// [`ExcelError::Released`]
    pub fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.storage = None;
        self.session = None;
        Ok(())
    }

    /// Flush and hand back the storage
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        self.session = None;
        self.storage.take().ok_or(ExcelError::Released("writer"))
    }

    /// Last committed row of the current sheet (0 before any write)
    pub fn current_row(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.next_row - 1)
    }

    /// Actual name of the sheet being written
    pub fn current_sheet_name(&self) -> Option<&str> {
        let session = self.session.as_ref()?;
        self.workbook
            .sheets()
            .get(session.sheet)
            .map(|s| s.name.as_str())
    }

    /// Names of every sheet in the workbook, in order
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheets().iter().map(|s| s.name.clone()).collect()
    }

    pub fn culture(&self) -> &Culture {
        &self.culture
    }

    fn ensure_open(&self) -> Result<()> {
        match self.storage {
            Some(_) => Ok(()),
            None => Err(ExcelError::Released("writer")),
        }
    }

    /// Add a sheet, write its header row and set up fresh column metadata
    fn start_sheet(&mut self, requested: String, fields: &[FieldDescriptor]) -> Result<SheetSession> {
        let index = self.workbook.add_sheet(&requested);
        let mut columns: Vec<ColumnFormat> = fields.iter().map(ColumnFormat::from).collect();

        let (sheet, strings) = self
            .workbook
            .sheet_and_strings_mut(index)
            .ok_or_else(|| ExcelError::WriteError(format!("sheet '{}' was not created", requested)))?;

        let mut next_row = 1;
        if !fields.is_empty() {
            let mut writer = CellWriter::new(strings, &mut columns, &self.culture);
            let cells = fields
                .iter()
                .enumerate()
                .map(|(column, field)| writer.write_header(1, column as u32, &field.name))
                .collect();
            sheet.rows.push(Row::new(1, cells));
            next_row = 2;
        }

        Ok(SheetSession {
            requested,
            sheet: index,
            next_row,
            width: fields.len(),
            columns,
        })
    }
}

fn write_rows<I, R, S>(
    workbook: &mut Workbook,
    session: &mut SheetSession,
    culture: &Culture,
    rows: I,
) -> Result<()>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let (sheet, strings) = workbook
        .sheet_and_strings_mut(session.sheet)
        .ok_or_else(|| ExcelError::WriteError("current sheet no longer exists".to_string()))?;

    for values in rows {
        let values = values.as_ref();
        let row = session.next_row;

        let mut writer = CellWriter::new(strings, &mut session.columns, culture);
        let mut cells = Vec::with_capacity(values.len());
        for (column, value) in values.iter().enumerate() {
            let cell = writer
                .write(row, column as u32, value.as_ref())
                .map_err(|e| e.at_row(row, &sheet.name))?;
            cells.extend(cell);
        }

        sheet.rows.push(Row::new(row, cells));
        session.width = session.width.max(values.len());
        session.next_row += 1;
    }
    Ok(())
}

impl<W: Storage> Drop for RecordWriter<W> {
    fn drop(&mut self) {
        if self.storage.is_some() {
            if let Err(e) = self.flush() {
                log::warn!("failed to flush workbook on drop: {}", e);
            }
        }
    }
}

/// Builder for creating configured record writers
#[derive(Debug, Clone)]
pub struct RecordWriterBuilder {
    default_sheet_name: Option<String>,
    culture: Option<Culture>,
    autofit: bool,
}

impl RecordWriterBuilder {
    pub fn new() -> Self {
        RecordWriterBuilder {
            default_sheet_name: None,
            culture: None,
            autofit: true,
        }
    }

    /// Sheet used by batches that name none (default `Sheet1`)
    pub fn with_sheet_name(mut self, name: &str) -> Self {
        self.default_sheet_name = Some(name.to_string());
        self
    }

    /// Culture used to re-parse rendered numbers and dates
    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = Some(culture);
        self
    }

    /// Enable or disable column width estimation after each batch
    pub fn with_autofit(mut self, autofit: bool) -> Self {
        self.autofit = autofit;
        self
    }

    /// Build a writer over `storage`, loading the workbook it already holds
    pub fn build<W: Storage>(self, mut storage: W) -> Result<RecordWriter<W>> {
        let len = storage.seek(SeekFrom::End(0))?;
        let workbook = if len == 0 {
            Workbook::new()
        } else {
            storage.seek(SeekFrom::Start(0))?;
            let package = Package::open(&mut storage)?;
            Workbook::from_package(&package)?
        };

        Ok(RecordWriter {
            storage: Some(storage),
            workbook,
            culture: self.culture.unwrap_or_default(),
            default_sheet_name: self
                .default_sheet_name
                .unwrap_or_else(|| "Sheet1".to_string()),
            autofit: self.autofit,
            session: None,
        })
    }

    /// Build a writer over a new (or truncated) file
    pub fn create<P: AsRef<Path>>(self, path: P) -> Result<RecordWriter<File>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        self.build(file)
    }

    /// Build a writer over an existing file, creating it if missing
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<RecordWriter<File>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        self.build(file)
    }
}

impl Default for RecordWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
