//! Record mapping boundary
//!
//! The library never inspects record types itself. A record describes its
//! columns once through [`Record::fields`] and renders each instance into one
//! string per field; the cell writer then decides the native cell encoding from
//! the declared [`FieldType`]. Reading goes the other way through [`FromRecord`].

use crate::culture::Culture;
use crate::error::{ExcelError, Result};
use crate::serial;
use crate::styles::CellStyle;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldType {
    /// Strings and identifiers (GUIDs)
    Text,
    Date,
    Time,
    DateTime,
    Int32,
    Decimal,
    Double,
    Boolean,
}

impl FieldType {
    /// Style applied when the column declares no explicit one
    pub fn default_style(&self) -> Option<CellStyle> {
        match self {
            FieldType::Text | FieldType::Boolean => None,
            FieldType::Date => Some(CellStyle::DateDefault),
            FieldType::Time => Some(CellStyle::TimeWithHoursMinutesSecondsDefault),
            FieldType::DateTime => Some(CellStyle::DateTimeWithHoursMinutesSecondsDefault),
            FieldType::Int32 => Some(CellStyle::NumberIntegerDefault),
            FieldType::Decimal => Some(CellStyle::NumberDecimalWithTwoDecimalsDefault),
            FieldType::Double => Some(CellStyle::ScientificWithTwoDecimalsDefault),
        }
    }
}

impl FromStr for FieldType {
    type Err = ExcelError;

    /// Resolve a type name as reported by a mapping layer.
    ///
    /// Nullable spellings (`Nullable<Int32>`, `Int32?`, `Option<i32>`) resolve to
    /// their underlying type.
    fn from_str(name: &str) -> Result<Self> {
        let mut inner = name.trim();
        loop {
            if let Some(rest) = inner.strip_suffix('?') {
                inner = rest.trim();
            } else if let Some(rest) = inner
                .strip_prefix("Nullable<")
                .or_else(|| inner.strip_prefix("Option<"))
                .and_then(|r| r.strip_suffix('>'))
            {
                inner = rest.trim();
            } else {
                break;
            }
        }
        let inner = inner.rsplit(['.', ':']).next().unwrap_or(inner);

        match inner.to_ascii_lowercase().as_str() {
            "string" | "str" | "&str" | "guid" | "uuid" | "text" => Ok(FieldType::Text),
            "dateonly" | "date" | "naivedate" => Ok(FieldType::Date),
            "timeonly" | "time" | "naivetime" => Ok(FieldType::Time),
            "datetime" | "naivedatetime" => Ok(FieldType::DateTime),
            "int32" | "int" | "i32" => Ok(FieldType::Int32),
            "decimal" => Ok(FieldType::Decimal),
            "double" | "f64" => Ok(FieldType::Double),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            _ => Err(ExcelError::UnsupportedType(name.to_string())),
        }
    }
}

/// One column as declared by a record type
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDescriptor {
    /// Header text
    pub name: String,
    pub field_type: FieldType,
    /// Explicit style overriding the type's default
    pub style: Option<CellStyle>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldDescriptor {
            name: name.into(),
            field_type,
            style: None,
        }
    }

    pub fn with_style(mut self, style: CellStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Style this column's data cells receive
    pub fn effective_style(&self) -> Option<CellStyle> {
        self.style.or_else(|| self.field_type.default_style())
    }
}

/// A typed record that can be written as one worksheet row
pub trait Record {
    /// Ordered column declarations, used for the header row
    fn fields() -> Vec<FieldDescriptor>;

    /// Render the record into one string per declared field.
    ///
    /// Empty strings leave the cell blank. Use the `render_*` helpers so dates
    /// become serial numbers and numbers follow the culture.
    fn to_row(&self, culture: &Culture) -> Vec<String>;
}

/// A typed record rebuilt from one dense worksheet row
pub trait FromRecord: Sized {
    fn from_row(row: &[String], culture: &Culture) -> Result<Self>;
}

pub fn render_date(value: NaiveDate) -> String {
    serial::format_serial(serial::date_to_serial(value))
}

pub fn render_time(value: NaiveTime) -> String {
    serial::format_serial(serial::time_to_serial(value))
}

pub fn render_datetime(value: NaiveDateTime) -> String {
    serial::format_serial(serial::datetime_to_serial(value))
}

pub fn render_f64(value: f64, culture: &Culture) -> String {
    culture.format_f64(value)
}

pub fn render_decimal(value: &Decimal, culture: &Culture) -> String {
    culture.format_decimal(value)
}

pub fn render_bool(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

/// Render an optional value, leaving the cell blank for `None`
pub fn render_opt<T>(value: Option<T>, render: impl FnOnce(T) -> String) -> String {
    value.map(render).unwrap_or_default()
}

/// Parse a date read back from a cell: a serial number or culture text
pub fn parse_date(text: &str, culture: &Culture) -> Result<NaiveDate> {
    parse_datetime(text, culture).map(|dt| dt.date())
}

/// Parse a date-time read back from a cell: a serial number or culture text
pub fn parse_datetime(text: &str, culture: &Culture) -> Result<NaiveDateTime> {
    if let Ok(value) = serial::parse_serial(text) {
        return Ok(value);
    }
    culture
        .parse_datetime(text)
        .or_else(|| culture.parse_date(text).and_then(|d| d.and_hms_opt(0, 0, 0)))
        .ok_or_else(|| ExcelError::InvalidFormat(format!("'{}' is not a date", text)))
}

/// Parse a boolean read back from a cell (`TRUE`/`FALSE`, `1`/`0`)
pub fn parse_bool(text: &str) -> Result<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ExcelError::InvalidFormat(format!("'{}' is not a boolean", text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_names() {
        assert_eq!("String".parse::<FieldType>().unwrap(), FieldType::Text);
        assert_eq!("System.Guid".parse::<FieldType>().unwrap(), FieldType::Text);
        assert_eq!("Nullable<Int32>".parse::<FieldType>().unwrap(), FieldType::Int32);
        assert_eq!("DateOnly?".parse::<FieldType>().unwrap(), FieldType::Date);
        assert_eq!("Option<f64>".parse::<FieldType>().unwrap(), FieldType::Double);
        assert_eq!("chrono::NaiveDateTime".parse::<FieldType>().unwrap(), FieldType::DateTime);
    }

    #[test]
    fn test_unsupported_type() {
        let err = "Int64".parse::<FieldType>().unwrap_err();
        assert!(matches!(err, ExcelError::UnsupportedType(ref t) if t == "Int64"));
    }

    #[test]
    fn test_effective_style() {
        let date = FieldDescriptor::new("When", FieldType::Date);
        assert_eq!(date.effective_style(), Some(CellStyle::DateDefault));

        let iso = date.clone().with_style(CellStyle::DateIso);
        assert_eq!(iso.effective_style(), Some(CellStyle::DateIso));

        assert_eq!(FieldDescriptor::new("Ok", FieldType::Boolean).effective_style(), None);
    }

    #[test]
    fn test_render_helpers() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        assert_eq!(render_date(date), "44198");
        assert_eq!(render_opt(None::<bool>, render_bool), "");
        assert_eq!(render_f64(1.5, &Culture::de_de()), "1,5");
    }

    #[test]
    fn test_parse_helpers() {
        let culture = Culture::en_us();
        let date = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        assert_eq!(parse_date("44198", &culture).unwrap(), date);
        assert_eq!(parse_date("1/2/2021", &culture).unwrap(), date);
        assert!(parse_date("yesterday", &culture).is_err());
        assert!(parse_bool("TRUE").unwrap());
        assert!(parse_bool("maybe").is_err());
    }
}
