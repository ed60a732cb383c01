//! Error types for the excelbind library

use thiserror::Error;

/// Result type alias for excelbind operations
pub type Result<T> = std::result::Result<T, ExcelError>;

/// Main error type for all Excel operations
#[derive(Error, Debug)]
pub enum ExcelError {
    /// Error occurred while reading an Excel package
    #[error("Failed to read Excel file: {0}")]
    ReadError(String),

    /// Error occurred while writing an Excel package
    #[error("Failed to write Excel file: {0}")]
    WriteError(String),

    /// Invalid sheet name or sheet not found
    #[error("Sheet '{sheet}' not found. Available sheets: {available}")]
    SheetNotFound { sheet: String, available: String },

    /// Error occurred while writing a row
    #[error("Failed to write row {row} to sheet '{sheet}': {source}")]
    WriteRowError {
        row: u32,
        sheet: String,
        #[source]
        source: Box<ExcelError>,
    },

    /// Malformed cell coordinate or column index
    #[error("Invalid cell reference: {0}")]
    InvalidCell(String),

    /// Numeric, date or culture text that could not be parsed
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Field type with no cell encoding rule
    #[error("Unsupported field type '{0}': convert it to a string field before writing")]
    UnsupportedType(String),

    /// The reader or writer was already closed
    #[error("The {0} has already been released")]
    Released(&'static str),

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// ZIP container error
    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// XML parsing error
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),
}

impl From<quick_xml::events::attributes::AttrError> for ExcelError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ExcelError::XmlError(err.into())
    }
}

impl ExcelError {
    /// Attach the row/sheet position to an error raised while writing a cell
    pub(crate) fn at_row(self, row: u32, sheet: &str) -> Self {
        ExcelError::WriteRowError {
            row,
            sheet: sheet.to_string(),
            source: Box::new(self),
        }
    }
}
