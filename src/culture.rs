//! Culture settings used to re-parse rendered field values
//!
//! Field values reach the cell writer already rendered as text. Decimal and
//! floating point values are re-parsed with the active culture's separators, and
//! date/time values are probed against the culture's patterns before falling back
//! to a numeric serial.

use crate::error::{ExcelError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Number and date conventions of a locale
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Culture {
    name: String,
    decimal_separator: char,
    group_separator: char,
    date_patterns: Vec<String>,
    time_patterns: Vec<String>,
    datetime_patterns: Vec<String>,
    datetime_display: String,
}

fn patterns(items: &[&str]) -> Vec<String> {
    items.iter().map(|p| p.to_string()).collect()
}

impl Culture {
    /// Culture-neutral conventions (`.` decimal separator, ISO-like dates)
    pub fn invariant() -> Self {
        Culture {
            name: "invariant".to_string(),
            decimal_separator: '.',
            group_separator: ',',
            date_patterns: patterns(&["%m/%d/%Y", "%Y-%m-%d"]),
            time_patterns: patterns(&["%H:%M:%S", "%H:%M", "%H:%M:%S%.f"]),
            datetime_patterns: patterns(&[
                "%m/%d/%Y %H:%M:%S",
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%dT%H:%M:%S%.f",
            ]),
            datetime_display: "%m/%d/%Y %H:%M:%S".to_string(),
        }
    }

    /// United States English
    pub fn en_us() -> Self {
        Culture {
            name: "en-US".to_string(),
            decimal_separator: '.',
            group_separator: ',',
            date_patterns: patterns(&["%m/%d/%Y", "%Y-%m-%d"]),
            time_patterns: patterns(&["%I:%M:%S %p", "%I:%M %p", "%H:%M:%S", "%H:%M"]),
            datetime_patterns: patterns(&[
                "%m/%d/%Y %I:%M:%S %p",
                "%m/%d/%Y %I:%M %p",
                "%m/%d/%Y %H:%M:%S",
                "%Y-%m-%dT%H:%M:%S",
            ]),
            datetime_display: "%-m/%-d/%Y %-I:%M:%S %p".to_string(),
        }
    }

    /// British English
    pub fn en_gb() -> Self {
        Culture {
            name: "en-GB".to_string(),
            decimal_separator: '.',
            group_separator: ',',
            date_patterns: patterns(&["%d/%m/%Y", "%Y-%m-%d"]),
            time_patterns: patterns(&["%H:%M:%S", "%H:%M"]),
            datetime_patterns: patterns(&["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M", "%Y-%m-%dT%H:%M:%S"]),
            datetime_display: "%d/%m/%Y %H:%M:%S".to_string(),
        }
    }

    /// German
    pub fn de_de() -> Self {
        Culture {
            name: "de-DE".to_string(),
            decimal_separator: ',',
            group_separator: '.',
            date_patterns: patterns(&["%d.%m.%Y", "%Y-%m-%d"]),
            time_patterns: patterns(&["%H:%M:%S", "%H:%M"]),
            datetime_patterns: patterns(&["%d.%m.%Y %H:%M:%S", "%d.%m.%Y %H:%M", "%Y-%m-%dT%H:%M:%S"]),
            datetime_display: "%d.%m.%Y %H:%M:%S".to_string(),
        }
    }

    /// French
    pub fn fr_fr() -> Self {
        Culture {
            name: "fr-FR".to_string(),
            decimal_separator: ',',
            group_separator: '\u{202f}',
            date_patterns: patterns(&["%d/%m/%Y", "%Y-%m-%d"]),
            time_patterns: patterns(&["%H:%M:%S", "%H:%M"]),
            datetime_patterns: patterns(&["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M", "%Y-%m-%dT%H:%M:%S"]),
            datetime_display: "%d/%m/%Y %H:%M:%S".to_string(),
        }
    }

    /// Look up a preset by its BCP-47 style name (`"en-US"`, `"de-DE"`, ...)
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "" | "invariant" => Ok(Self::invariant()),
            "en-us" | "en" => Ok(Self::en_us()),
            "en-gb" => Ok(Self::en_gb()),
            "de-de" | "de" => Ok(Self::de_de()),
            "fr-fr" | "fr" => Ok(Self::fr_fr()),
            _ => Err(ExcelError::InvalidFormat(format!(
                "unknown culture '{}'",
                name
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    /// Strip group separators and normalize the decimal separator to `.`
    fn normalize_number(&self, text: &str) -> String {
        text.trim()
            .chars()
            .filter(|c| *c != self.group_separator && !(self.group_separator.is_whitespace() && c.is_whitespace()))
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect()
    }

    /// Parse a floating point number written in this culture
    pub fn parse_f64(&self, text: &str) -> Result<f64> {
        let normalized = self.normalize_number(text);
        normalized.parse::<f64>().map_err(|_| {
            ExcelError::InvalidFormat(format!(
                "'{}' is not a number in culture {}",
                text, self.name
            ))
        })
    }

    /// Parse a decimal number written in this culture
    pub fn parse_decimal(&self, text: &str) -> Result<Decimal> {
        let normalized = self.normalize_number(text);
        Decimal::from_str(&normalized)
            .or_else(|_| Decimal::from_scientific(&normalized))
            .map_err(|_| {
                ExcelError::InvalidFormat(format!(
                    "'{}' is not a decimal in culture {}",
                    text, self.name
                ))
            })
    }

    /// Render a float with this culture's decimal separator
    pub fn format_f64(&self, value: f64) -> String {
        self.localize(value.to_string())
    }

    /// Render a decimal with this culture's decimal separator
    pub fn format_decimal(&self, value: &Decimal) -> String {
        self.localize(value.to_string())
    }

    fn localize(&self, invariant: String) -> String {
        if self.decimal_separator == '.' {
            invariant
        } else {
            invariant.replace('.', &self.decimal_separator.to_string())
        }
    }

    pub fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        self.date_patterns
            .iter()
            .find_map(|p| NaiveDate::parse_from_str(text, p).ok())
    }

    pub fn parse_time(&self, text: &str) -> Option<NaiveTime> {
        let text = text.trim();
        self.time_patterns
            .iter()
            .find_map(|p| NaiveTime::parse_from_str(text, p).ok())
    }

    pub fn parse_datetime(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        self.datetime_patterns
            .iter()
            .find_map(|p| NaiveDateTime::parse_from_str(text, p).ok())
    }

    /// Default textual form of a date-time value
    pub fn format_datetime(&self, value: &NaiveDateTime) -> String {
        value.format(&self.datetime_display).to_string()
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}

impl FromStr for Culture {
    type Err = ExcelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}
