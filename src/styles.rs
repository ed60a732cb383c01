//! Workbook-wide style table
//!
//! Every workbook written by this crate carries the same fixed `styles.xml`;
//! a [`CellStyle`] is simply the index of its `<xf>` entry in `cellXfs`.

use crate::error::{ExcelError, Result};
use crate::fast_writer::xml_writer::XmlWriter;
use std::io::Write;
use std::str::FromStr;

/// Cell style presets for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellStyle {
    /// Default style - no formatting
    Default = 0,
    /// Bold, centered text used for header rows
    HeaderBoldCentered = 1,
    /// Text format (@)
    TextDefault = 2,
    /// Integer format (0)
    NumberIntegerDefault = 3,
    /// Decimal format with 2 places (0.00)
    NumberDecimalWithTwoDecimalsDefault = 4,
    /// Integer with thousand separator (#,##0)
    NumberIntegerWithThousandsSeparator = 5,
    /// Decimal with thousand separator (#,##0.00)
    NumberDecimalWithThousandsSeparator = 6,
    /// Decimal with 4 places (0.0000)
    NumberDecimalWithFourDecimals = 7,
    /// Currency ($#,##0.00)
    CurrencyDefault = 8,
    /// Currency without decimals ($#,##0)
    CurrencyInteger = 9,
    /// Currency with negatives in red
    CurrencyNegativeRed = 10,
    /// Accounting with 2 decimals
    AccountingDefault = 11,
    /// Accounting without decimals
    AccountingInteger = 12,
    /// Short date (m/d/yyyy)
    DateDefault = 13,
    /// d-mmm-yy
    DateWithDayMonthNameYear = 14,
    /// mmm-yy
    DateWithMonthNameYear = 15,
    /// yyyy-mm-dd
    DateIso = 16,
    /// dddd, mmmm dd, yyyy
    DateLong = 17,
    /// h:mm
    TimeWithHoursMinutes = 18,
    /// h:mm:ss
    TimeWithHoursMinutesSecondsDefault = 19,
    /// h:mm AM/PM
    TimeWithHoursMinutesAmPm = 20,
    /// [h]:mm:ss
    TimeElapsedHours = 21,
    /// m/d/yy h:mm
    DateTimeWithHoursMinutes = 22,
    /// m/d/yyyy h:mm:ss
    DateTimeWithHoursMinutesSecondsDefault = 23,
    /// 0%
    PercentageInteger = 24,
    /// 0.00%
    PercentageWithTwoDecimals = 25,
    /// 0.00E+00
    ScientificWithTwoDecimalsDefault = 26,
    /// 00000
    ZipCode = 27,
    /// 00000-0000
    ZipCodePlus4 = 28,
}

/// Broad grouping used by the autofit sizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleFamily {
    General,
    Text,
    Number,
    Currency,
    Accounting,
    Date,
    Time,
    DateTime,
    Percentage,
    Scientific,
    ZipCode,
}

const FIRST_CUSTOM_FORMAT: u32 = 164;

/// Custom number formats, in the order their ids are assigned from 164
const CUSTOM_FORMATS: &[(CellStyle, &str)] = &[
    (CellStyle::NumberDecimalWithFourDecimals, "0.0000"),
    (CellStyle::CurrencyDefault, "\"$\"#,##0.00"),
    (CellStyle::CurrencyInteger, "\"$\"#,##0"),
    (CellStyle::CurrencyNegativeRed, "\"$\"#,##0.00;[Red]\\-\"$\"#,##0.00"),
    (
        CellStyle::AccountingInteger,
        "_(\"$\"* #,##0_);_(\"$\"* \\(#,##0\\);_(\"$\"* \"-\"_);_(@_)",
    ),
    (CellStyle::DateIso, "yyyy\\-mm\\-dd"),
    (CellStyle::DateLong, "dddd, mmmm dd, yyyy"),
    (CellStyle::DateTimeWithHoursMinutesSecondsDefault, "m/d/yyyy h:mm:ss"),
    (CellStyle::ZipCode, "00000"),
    (CellStyle::ZipCodePlus4, "00000\\-0000"),
];

impl CellStyle {
    /// Every style, in `cellXfs` order
    pub const ALL: [CellStyle; 29] = [
        CellStyle::Default,
        CellStyle::HeaderBoldCentered,
        CellStyle::TextDefault,
        CellStyle::NumberIntegerDefault,
        CellStyle::NumberDecimalWithTwoDecimalsDefault,
        CellStyle::NumberIntegerWithThousandsSeparator,
        CellStyle::NumberDecimalWithThousandsSeparator,
        CellStyle::NumberDecimalWithFourDecimals,
        CellStyle::CurrencyDefault,
        CellStyle::CurrencyInteger,
        CellStyle::CurrencyNegativeRed,
        CellStyle::AccountingDefault,
        CellStyle::AccountingInteger,
        CellStyle::DateDefault,
        CellStyle::DateWithDayMonthNameYear,
        CellStyle::DateWithMonthNameYear,
        CellStyle::DateIso,
        CellStyle::DateLong,
        CellStyle::TimeWithHoursMinutes,
        CellStyle::TimeWithHoursMinutesSecondsDefault,
        CellStyle::TimeWithHoursMinutesAmPm,
        CellStyle::TimeElapsedHours,
        CellStyle::DateTimeWithHoursMinutes,
        CellStyle::DateTimeWithHoursMinutesSecondsDefault,
        CellStyle::PercentageInteger,
        CellStyle::PercentageWithTwoDecimals,
        CellStyle::ScientificWithTwoDecimalsDefault,
        CellStyle::ZipCode,
        CellStyle::ZipCodePlus4,
    ];

    /// Get the style index for XML
    pub fn index(&self) -> u32 {
        *self as u32
    }

    /// Style for a `s="..."` attribute value
    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Number format id referenced by this style's `<xf>`
    pub fn num_fmt_id(&self) -> u32 {
        if let Some(pos) = CUSTOM_FORMATS.iter().position(|(s, _)| s == self) {
            return FIRST_CUSTOM_FORMAT + pos as u32;
        }
        match self {
            CellStyle::Default | CellStyle::HeaderBoldCentered => 0,
            CellStyle::TextDefault => 49,
            CellStyle::NumberIntegerDefault => 1,
            CellStyle::NumberDecimalWithTwoDecimalsDefault => 2,
            CellStyle::NumberIntegerWithThousandsSeparator => 3,
            CellStyle::NumberDecimalWithThousandsSeparator => 4,
            CellStyle::AccountingDefault => 44,
            CellStyle::DateDefault => 14,
            CellStyle::DateWithDayMonthNameYear => 15,
            CellStyle::DateWithMonthNameYear => 17,
            CellStyle::TimeWithHoursMinutes => 20,
            CellStyle::TimeWithHoursMinutesSecondsDefault => 21,
            CellStyle::TimeWithHoursMinutesAmPm => 18,
            CellStyle::TimeElapsedHours => 46,
            CellStyle::DateTimeWithHoursMinutes => 22,
            CellStyle::PercentageInteger => 9,
            CellStyle::PercentageWithTwoDecimals => 10,
            CellStyle::ScientificWithTwoDecimalsDefault => 11,
            // custom formats are resolved above
            _ => 0,
        }
    }

    pub fn family(&self) -> StyleFamily {
        use CellStyle::*;
        match self {
            Default | HeaderBoldCentered => StyleFamily::General,
            TextDefault => StyleFamily::Text,
            NumberIntegerDefault
            | NumberDecimalWithTwoDecimalsDefault
            | NumberIntegerWithThousandsSeparator
            | NumberDecimalWithThousandsSeparator
            | NumberDecimalWithFourDecimals => StyleFamily::Number,
            CurrencyDefault | CurrencyInteger | CurrencyNegativeRed => StyleFamily::Currency,
            AccountingDefault | AccountingInteger => StyleFamily::Accounting,
            DateDefault | DateWithDayMonthNameYear | DateWithMonthNameYear | DateIso
            | DateLong => StyleFamily::Date,
            TimeWithHoursMinutes
            | TimeWithHoursMinutesSecondsDefault
            | TimeWithHoursMinutesAmPm
            | TimeElapsedHours => StyleFamily::Time,
            DateTimeWithHoursMinutes | DateTimeWithHoursMinutesSecondsDefault => {
                StyleFamily::DateTime
            }
            PercentageInteger | PercentageWithTwoDecimals => StyleFamily::Percentage,
            ScientificWithTwoDecimalsDefault => StyleFamily::Scientific,
            ZipCode | ZipCodePlus4 => StyleFamily::ZipCode,
        }
    }

    /// Bytes of the fixed `xl/styles.xml` part
    pub fn stylesheet_xml() -> Result<Vec<u8>> {
        let mut writer = XmlWriter::new(Vec::new());
        Self::write_stylesheet(&mut writer)?;
        writer.finish()
    }

    /// Write the fixed `xl/styles.xml` part
    pub fn write_stylesheet<W: Write>(writer: &mut XmlWriter<W>) -> Result<()> {
        writer.declaration()?;
        writer.start("styleSheet")?;
        writer.attr("xmlns", "http://schemas.openxmlformats.org/spreadsheetml/2006/main")?;

        writer.start("numFmts")?;
        writer.attr_uint("count", CUSTOM_FORMATS.len() as u64)?;
        for (style, code) in CUSTOM_FORMATS {
            writer.start("numFmt")?;
            writer.attr_uint("numFmtId", style.num_fmt_id() as u64)?;
            writer.attr("formatCode", code)?;
            writer.end()?;
        }
        writer.end()?;

        writer.raw(
            "<fonts count=\"2\">\
             <font><sz val=\"11\"/><name val=\"Calibri\"/><family val=\"2\"/></font>\
             <font><b/><sz val=\"11\"/><name val=\"Calibri\"/><family val=\"2\"/></font>\
             </fonts>\
             <fills count=\"2\">\
             <fill><patternFill patternType=\"none\"/></fill>\
             <fill><patternFill patternType=\"gray125\"/></fill>\
             </fills>\
             <borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>\
             <cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>",
        )?;

        writer.start("cellXfs")?;
        writer.attr_uint("count", Self::ALL.len() as u64)?;
        for style in Self::ALL {
            let header = style == CellStyle::HeaderBoldCentered;
            writer.start("xf")?;
            writer.attr_uint("numFmtId", style.num_fmt_id() as u64)?;
            writer.attr_uint("fontId", u64::from(header))?;
            writer.attr("fillId", "0")?;
            writer.attr("borderId", "0")?;
            writer.attr("xfId", "0")?;
            if style.num_fmt_id() != 0 {
                writer.attr("applyNumberFormat", "1")?;
            }
            if header {
                writer.attr("applyFont", "1")?;
                writer.attr("applyAlignment", "1")?;
                writer.start("alignment")?;
                writer.attr("horizontal", "center")?;
                writer.end()?;
            }
            writer.end()?;
        }
        writer.end()?;

        writer.raw(
            "<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>",
        )?;
        writer.end()
    }
}

impl FromStr for CellStyle {
    type Err = ExcelError;

    /// Parse a style by its variant name, as supplied in field format overrides
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|style| format!("{:?}", style).eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ExcelError::InvalidFormat(format!("unknown cell style '{}'", s)))
    }
}
