use chrono::{Local, LocalResult, TimeZone};
use serde::Deserialize;

use crate::dataset::CellValue;

// Closed set of display formatters. Unknown tags in a data file fail at
// load time when the header list is deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FormatKind {
    #[serde(rename = "sizeFormat")]
    Size,
    #[serde(rename = "dateFormat")]
    Date,
}

pub fn format(kind: FormatKind, value: &CellValue) -> String {
    match kind {
        FormatKind::Size => size_format(value),
        FormatKind::Date => date_format(value),
    }
}

// Byte count with base-1024 unit suffix. Bytes print as an integer, larger
// units with two decimals. Non numeric input flows through as NaN instead
// of failing.
fn size_format(value: &CellValue) -> String {
    let size = value.as_f64().unwrap_or(f64::NAN);
    if size < 1024.0 {
        format!("{} B", CellValue::Number(size).as_text())
    } else if size < 1024f64.powi(2) {
        format!("{:.2} KB", size / 1024.0)
    } else if size < 1024f64.powi(3) {
        format!("{:.2} MB", size / 1024f64.powi(2))
    } else {
        format!("{:.2} GB", size / 1024f64.powi(3))
    }
}

// Millisecond timestamp (number or numeric string) as YYYY-MM-DD in local
// time.
fn date_format(value: &CellValue) -> String {
    let ms = value.as_f64().filter(|n| n.is_finite());
    let Some(ms) = ms else {
        return "invalid date".to_string();
    };
    match Local.timestamp_millis_opt(ms as i64) {
        LocalResult::Single(date) => date.format("%Y-%m-%d").to_string(),
        _ => "invalid date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_units() {
        assert_eq!(format(FormatKind::Size, &CellValue::Number(0.0)), "0 B");
        assert_eq!(format(FormatKind::Size, &CellValue::Number(512.0)), "512 B");
        assert_eq!(
            format(FormatKind::Size, &CellValue::Number(2048.0)),
            "2.00 KB"
        );
        assert_eq!(
            format(FormatKind::Size, &CellValue::Number(1536.0)),
            "1.50 KB"
        );
        assert_eq!(
            format(FormatKind::Size, &CellValue::Number(3.0 * 1024.0 * 1024.0)),
            "3.00 MB"
        );
        assert_eq!(
            format(
                FormatKind::Size,
                &CellValue::Number(5.5 * 1024.0 * 1024.0 * 1024.0)
            ),
            "5.50 GB"
        );
    }

    #[test]
    fn size_accepts_numeric_strings() {
        assert_eq!(
            format(FormatKind::Size, &CellValue::Text("2048".to_string())),
            "2.00 KB"
        );
    }

    #[test]
    fn size_of_garbage_does_not_panic() {
        assert_eq!(
            format(FormatKind::Size, &CellValue::Text("large".to_string())),
            "NaN GB"
        );
    }

    #[test]
    fn date_renders_local_calendar_date() {
        let expected = Local
            .timestamp_millis_opt(1_700_000_000_000)
            .unwrap()
            .format("%Y-%m-%d")
            .to_string();
        let rendered = format(FormatKind::Date, &CellValue::Number(1_700_000_000_000.0));
        assert_eq!(rendered, expected);
        assert_eq!(rendered.len(), 10);
        assert_eq!(&rendered[4..5], "-");
        assert_eq!(&rendered[7..8], "-");
    }

    #[test]
    fn date_accepts_numeric_strings() {
        let from_number = format(FormatKind::Date, &CellValue::Number(1_700_000_000_000.0));
        let from_text = format(
            FormatKind::Date,
            &CellValue::Text("1700000000000".to_string()),
        );
        assert_eq!(from_number, from_text);
    }

    #[test]
    fn date_of_garbage_is_flagged() {
        assert_eq!(
            format(FormatKind::Date, &CellValue::Text("tomorrow".to_string())),
            "invalid date"
        );
        assert_eq!(format(FormatKind::Date, &CellValue::Null), "invalid date");
    }
}
