//! # excelbind
//!
//! Bind typed tabular records to Excel (xlsx) worksheets and back.
//!
//! ## Features
//!
//! - **Type-directed writing**: each column's declared type picks the native cell
//!   encoding (inline number, boolean, shared string, date serial) and its style
//! - **Sparse row reading**: rows stored without their empty cells come back as
//!   dense string records
//! - **Two read strategies**: buffered (whole sheet in memory) or streaming (one
//!   row decoded per read), yielding identical records
//! - **Column autofit**: widths estimated from the longest value of each column
//! - **Sheet sessions**: batches aimed at a new sheet name start a new sheet with
//!   its own header row
//!
//! ## Quick Start
//!
//! ### Writing records
//!
//! ```rust,no_run
//! use excelbind::culture::Culture;
//! use excelbind::record::{render_date, FieldDescriptor, FieldType, Record};
//! use excelbind::writer::RecordWriter;
//! use chrono::NaiveDate;
//!
//! struct Member {
//!     name: String,
//!     joined: NaiveDate,
//! }
//!
//! impl Record for Member {
//!     fn fields() -> Vec<FieldDescriptor> {
//!         vec![
//!             FieldDescriptor::new("Name", FieldType::Text),
//!             FieldDescriptor::new("Joined", FieldType::Date),
//!         ]
//!     }
//!
//!     fn to_row(&self, _culture: &Culture) -> Vec<String> {
//!         vec![self.name.clone(), render_date(self.joined)]
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let members = vec![Member {
//!     name: "Alice".to_string(),
//!     joined: NaiveDate::from_ymd_opt(2021, 1, 2).unwrap(),
//! }];
//!
//! let mut writer = RecordWriter::create("members.xlsx")?;
//! writer.write_records(&members, Some("Members"))?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading rows
//!
//! ```rust,no_run
//! use excelbind::reader::{ExcelReader, RowSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reader = ExcelReader::open("members.xlsx")?;
//! let mut rows = reader.streaming(Some("Members"))?;
//! while rows.read()? {
//!     println!("Row {}: {:?}", rows.row(), rows.current_record()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod coordinate;
pub mod culture;
pub mod decode;
pub mod error;
pub mod fast_writer;
pub mod package;
pub mod reader;
pub mod record;
pub mod serial;
pub mod sheet_xml;
pub mod streaming_reader;
pub mod styles;
pub mod types;
pub mod writer;

pub use culture::Culture;
pub use error::{ExcelError, Result};
pub use reader::{BufferedRowSource, ExcelReader, ReaderOptions, RowSource};
pub use record::{FieldDescriptor, FieldType, FromRecord, Record};
pub use streaming_reader::StreamingRowSource;
pub use styles::CellStyle;
pub use types::{Cell, CellDataType, Row, Sheet};
pub use writer::{RecordWriter, RecordWriterBuilder, Storage};
