//! Workbook building for the write path
//!
//! This module holds the pieces a [`RecordWriter`](crate::writer::RecordWriter)
//! drives for every batch:
//! - type-directed cell encoding ([`cell_writer`])
//! - column width estimation ([`autofit`])
//! - the workbook-wide string table ([`shared_strings`])
//! - the in-memory workbook and its part serialization ([`workbook`], [`xml_writer`])

pub mod autofit;
pub mod cell_writer;
pub mod shared_strings;
pub mod workbook;
pub mod xml_writer;

pub use cell_writer::{CellWriter, ColumnFormat};
pub use shared_strings::SharedStrings;
pub use workbook::Workbook;
