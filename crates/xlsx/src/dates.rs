//! Spreadsheet date handling: date number formats and serial conversion.

use chrono::{Duration, NaiveDate};
use sheetdeck_core::CellValue;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Whether a number format renders its value as a date or time.
///
/// Built-in IDs 14-22 and 45-47 are date/time formats. Custom codes count
/// when a date token (`d`, `m`, `y`, `h`, `s`) remains after removing quoted
/// literals, escaped characters and bracketed sections.
pub fn is_date_format(num_fmt_id: u32, format_code: Option<&str>) -> bool {
    if matches!(num_fmt_id, 14..=22 | 45..=47) {
        return true;
    }

    let Some(code) = format_code else {
        return false;
    };

    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;

    for c in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '\\' => escaped = true,
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            _ if in_brackets => {}
            'd' | 'D' | 'm' | 'M' | 'y' | 'Y' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }

    false
}

/// Convert a date serial number into a date cell value.
///
/// The 1900 system counts from 1899-12-31 and includes the fictitious
/// 1900-02-29 (serial 60), so serials from 61 on are shifted by a day.
/// The 1904 system counts from 1904-01-01. Whole days become `Date`,
/// anything with a time part becomes `DateTime` rounded to the second.
pub fn serial_to_value(serial: f64, date1904: bool) -> Option<CellValue> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let base = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if serial < 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    let mut days = serial.floor() as i64;
    let mut seconds = ((serial - serial.floor()) * SECONDS_PER_DAY).round() as i64;
    if seconds >= SECONDS_PER_DAY as i64 {
        days += 1;
        seconds = 0;
    }

    let date = base.checked_add_signed(Duration::days(days))?;
    if seconds == 0 {
        Some(CellValue::Date(date))
    } else {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        Some(CellValue::DateTime(
            midnight.checked_add_signed(Duration::seconds(seconds))?,
        ))
    }
}
