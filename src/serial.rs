//! Spreadsheet date serial numbers
//!
//! A serial is a floating point day count anchored at 1899-12-30, the epoch that
//! absorbs the spreadsheet's historical 1900 leap-year bug for every date after
//! 1900-03-01. The fractional part is the time of day. Negative serials keep a
//! positive time fraction (`-1.25` is 1899-12-29 06:00).

use crate::error::{ExcelError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Smallest serial accepted (0100-01-01)
pub const MIN_SERIAL: f64 = -657_435.0;
/// Largest serial accepted (exclusive, 10000-01-01)
pub const MAX_SERIAL: f64 = 2_958_466.0;

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert a serial number to a calendar date-time.
pub fn serial_to_datetime(serial: f64) -> Result<NaiveDateTime> {
    if !serial.is_finite() || serial < MIN_SERIAL || serial >= MAX_SERIAL {
        return Err(ExcelError::InvalidFormat(format!(
            "date serial {} is out of range",
            serial
        )));
    }

    let days = serial.trunc();
    let mut millis = ((serial - days).abs() * MILLIS_PER_DAY).round() as i64;
    let mut days = days as i64;
    if millis >= MILLIS_PER_DAY as i64 {
        // fraction rounded up to the next midnight
        millis -= MILLIS_PER_DAY as i64;
        days += if serial < 0.0 { -1 } else { 1 };
    }

    Ok(epoch() + Duration::days(days) + Duration::milliseconds(millis))
}

/// Parse serial text (always invariant, as stored in the cell) into a date-time.
pub fn parse_serial(text: &str) -> Result<NaiveDateTime> {
    let serial = text.trim().parse::<f64>().map_err(|_| {
        ExcelError::InvalidFormat(format!("'{}' is not a date serial", text))
    })?;
    serial_to_datetime(serial)
}

pub fn date_to_serial(date: NaiveDate) -> f64 {
    (date - epoch().date()).num_days() as f64
}

pub fn time_to_serial(time: NaiveTime) -> f64 {
    let millis = time.num_seconds_from_midnight() as f64 * 1000.0
        + (time.nanosecond() / 1_000_000) as f64;
    millis / MILLIS_PER_DAY
}

pub fn datetime_to_serial(value: NaiveDateTime) -> f64 {
    date_to_serial(value.date()) + time_to_serial(value.time())
}

/// Render a serial the way cell values are stored (`44198`, `44198.5`)
pub fn format_serial(serial: f64) -> String {
    serial.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_known_serials() {
        assert_eq!(date_to_serial(ymd(2021, 1, 2)), 44198.0);
        assert_eq!(date_to_serial(ymd(1900, 3, 1)), 61.0);
        assert_eq!(date_to_serial(ymd(1899, 12, 30)), 0.0);
    }

    #[test]
    fn test_serial_to_datetime() {
        let dt = serial_to_datetime(44198.5).unwrap();
        assert_eq!(dt, ymd(2021, 1, 2).and_hms_opt(12, 0, 0).unwrap());

        let dt = serial_to_datetime(-1.25).unwrap();
        assert_eq!(dt, ymd(1899, 12, 29).and_hms_opt(6, 0, 0).unwrap());
    }

    #[test]
    fn test_round_up_to_midnight() {
        let dt = serial_to_datetime(1.999_999_999_9).unwrap();
        assert_eq!(dt, ymd(1900, 1, 1).and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_serial_errors() {
        assert!(matches!(parse_serial("abc"), Err(ExcelError::InvalidFormat(_))));
        assert!(matches!(parse_serial("3000000"), Err(ExcelError::InvalidFormat(_))));
    }

    #[test]
    fn test_time_serial() {
        let t = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        assert_eq!(time_to_serial(t), 0.75);
        assert_eq!(format_serial(0.75), "0.75");
        assert_eq!(format_serial(44198.0), "44198");
    }
}
