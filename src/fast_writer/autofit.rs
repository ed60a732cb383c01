//! Column width estimation from observed content length

use super::cell_writer::ColumnFormat;
use crate::record::FieldType;
use crate::styles::{CellStyle, StyleFamily};
use crate::types::ColumnWidth;

/// Expected rendered length and fixed width of a date/time style
fn temporal_bounds(style: CellStyle) -> Option<(usize, f64)> {
    use CellStyle::*;
    Some(match style {
        DateDefault | DateIso => (10, 12.0),
        DateWithDayMonthNameYear => (9, 11.0),
        DateWithMonthNameYear => (6, 9.0),
        DateLong => (27, 30.0),
        TimeWithHoursMinutes => (5, 8.0),
        TimeWithHoursMinutesSecondsDefault => (8, 10.0),
        TimeWithHoursMinutesAmPm => (11, 13.0),
        TimeElapsedHours => (10, 12.0),
        DateTimeWithHoursMinutes => (16, 18.0),
        DateTimeWithHoursMinutesSecondsDefault => (19, 21.0),
        _ => return None,
    })
}

/// Width of one column.
///
/// Date, time and date-time columns get the fixed width of their style until
/// content outgrows it. Floating point columns get 11 up to 9 characters.
/// Everything else pads short content by 2, medium content by 4 and long
/// content by 1.
pub fn column_width(format: &ColumnFormat) -> f64 {
    let len = format.max_len;
    let style = format.effective_style();

    let temporal = matches!(
        format.field_type,
        FieldType::Date | FieldType::Time | FieldType::DateTime
    ) || matches!(
        style.map(|s| s.family()),
        Some(StyleFamily::Date | StyleFamily::Time | StyleFamily::DateTime)
    );
    if temporal {
        let fallback = format.field_type.default_style().unwrap_or(CellStyle::DateDefault);
        let (expected, fixed) = style
            .and_then(temporal_bounds)
            .or_else(|| temporal_bounds(fallback))
            .unwrap_or((10, 12.0));
        return if len <= expected { fixed } else { (len + 2) as f64 };
    }

    let scientific = format.field_type == FieldType::Double
        || style.map(|s| s.family()) == Some(StyleFamily::Scientific);
    if scientific {
        return if len <= 9 { 11.0 } else { (len + 1) as f64 };
    }

    match len {
        0..=9 => (len + 2) as f64,
        10..=20 => (len + 4) as f64,
        _ => (len + 1) as f64,
    }
}

/// Width records for the first `column_count` columns
///
/// Columns never observed are sized as empty text.
pub fn autofit(columns: &[ColumnFormat], column_count: usize) -> Vec<ColumnWidth> {
    let untracked = ColumnFormat::new(FieldType::Text, None);
    (0..column_count)
        .map(|i| ColumnWidth {
            min: i as u32 + 1,
            max: i as u32 + 1,
            width: column_width(columns.get(i).unwrap_or(&untracked)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(field_type: FieldType, style: Option<CellStyle>, max_len: usize) -> ColumnFormat {
        ColumnFormat {
            field_type,
            style,
            max_len,
        }
    }

    #[test]
    fn test_date_default_width() {
        assert_eq!(column_width(&format(FieldType::Date, None, 8)), 12.0);
        assert_eq!(column_width(&format(FieldType::Date, None, 10)), 12.0);
        assert_eq!(column_width(&format(FieldType::Date, None, 15)), 17.0);
    }

    #[test]
    fn test_temporal_styles() {
        let long = format(FieldType::Date, Some(CellStyle::DateLong), 20);
        assert_eq!(column_width(&long), 30.0);
        let hm = format(FieldType::Time, Some(CellStyle::TimeWithHoursMinutes), 5);
        assert_eq!(column_width(&hm), 8.0);
        assert_eq!(column_width(&format(FieldType::DateTime, None, 19)), 21.0);
        // a text column declared with a date style still sizes as a date
        let styled = format(FieldType::Text, Some(CellStyle::DateIso), 4);
        assert_eq!(column_width(&styled), 12.0);
    }

    #[test]
    fn test_double_width() {
        assert_eq!(column_width(&format(FieldType::Double, None, 9)), 11.0);
        assert_eq!(column_width(&format(FieldType::Double, None, 14)), 15.0);
    }

    #[test]
    fn test_general_buckets() {
        assert_eq!(column_width(&format(FieldType::Text, None, 0)), 2.0);
        assert_eq!(column_width(&format(FieldType::Text, None, 9)), 11.0);
        assert_eq!(column_width(&format(FieldType::Int32, None, 10)), 14.0);
        assert_eq!(column_width(&format(FieldType::Text, None, 20)), 24.0);
        assert_eq!(column_width(&format(FieldType::Decimal, None, 21)), 22.0);
    }

    #[test]
    fn test_autofit_limits_columns() {
        let columns = vec![
            format(FieldType::Text, None, 3),
            format(FieldType::Date, None, 5),
            format(FieldType::Boolean, None, 4),
        ];
        let widths = autofit(&columns, 2);
        assert_eq!(widths.len(), 2);
        assert_eq!(widths[1], ColumnWidth { min: 2, max: 2, width: 12.0 });
    }

    #[test]
    fn test_autofit_covers_untracked_columns() {
        let columns = vec![format(FieldType::Date, None, 5)];
        let widths = autofit(&columns, 3);
        assert_eq!(widths.len(), 3);
        assert_eq!(widths[0].width, 12.0);
        assert_eq!(widths[2], ColumnWidth { min: 3, max: 3, width: 2.0 });
    }
}
