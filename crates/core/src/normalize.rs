//! Row normalization: title detection and value display formatting.
//!
//! The title field is picked from field *names* only: the first name that
//! contains "title" (any case), otherwise the first field.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{CellValue, Field, Row};

/// Regex matching field names that designate the slide title.
static TITLE_FIELD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)title").unwrap());

/// Largest magnitude printed as a plain integer. Beyond this, f64 stops
/// representing every integer exactly.
const MAX_PLAIN_INTEGER: f64 = 1e15;

/// A row split into its title and the remaining fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    /// Name of the field used as title, `None` for a row without fields.
    pub title_field: Option<String>,
    /// Title text, or the caller's fallback label.
    pub title_text: String,
    /// All other fields in source order, empty values included.
    pub remaining_fields: Vec<Field>,
}

/// Format a cell value for display.
///
/// - empty: `""`
/// - numbers: integral values without a fractional part, others in shortest
///   round-trip form with `.` as decimal separator
/// - booleans: `TRUE` / `FALSE`
/// - dates: ISO-8601 (`2024-03-01`, `2024-03-01T09:30:00`)
pub fn display_value(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Text(text) => text.clone(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Bool(true) => "TRUE".to_string(),
        CellValue::Bool(false) => "FALSE".to_string(),
        CellValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        CellValue::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < MAX_PLAIN_INTEGER {
        return (n as i64).to_string();
    }
    n.to_string()
}

/// Splits rows into title and body fields.
#[derive(Debug, Clone, Default)]
pub struct RowNormalizer;

impl RowNormalizer {
    /// Create a new row normalizer.
    pub fn new() -> Self {
        Self
    }

    /// Pick the title field name of a row, if it has any fields.
    pub fn title_field<'a>(&self, row: &'a Row) -> Option<&'a str> {
        let fields = row.fields();
        fields
            .iter()
            .find(|f| TITLE_FIELD_REGEX.is_match(&f.name))
            .or_else(|| fields.first())
            .map(|f| f.name.as_str())
    }

    /// Normalize a row.
    ///
    /// `fallback_label` becomes the title when the row has no fields or the
    /// title field is empty. The normalizer does not know the row's position;
    /// callers pass something like `"Slide 3"`.
    pub fn normalize(&self, row: &Row, fallback_label: &str) -> NormalizedRow {
        let fields = row.fields();

        let title_index = fields
            .iter()
            .position(|f| TITLE_FIELD_REGEX.is_match(&f.name))
            .or(if fields.is_empty() { None } else { Some(0) });

        let Some(title_index) = title_index else {
            return NormalizedRow {
                title_field: None,
                title_text: fallback_label.to_string(),
                remaining_fields: Vec::new(),
            };
        };

        let title = &fields[title_index];
        let title_text = match display_value(&title.value) {
            text if text.is_empty() => fallback_label.to_string(),
            text => text,
        };

        let remaining_fields = fields
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != title_index)
            .map(|(_, f)| Field {
                name: f.name.clone(),
                display_value: display_value(&f.value),
            })
            .collect();

        NormalizedRow {
            title_field: Some(title.name.clone()),
            title_text,
            remaining_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_title_field_by_name() {
        let row = Row::new()
            .with("A", "1")
            .with("Song Title", "Hi")
            .with("B", "2");
        let normalized = RowNormalizer::new().normalize(&row, "Slide 1");

        assert_eq!(normalized.title_field.as_deref(), Some("Song Title"));
        assert_eq!(normalized.title_text, "Hi");
        let names: Vec<&str> = normalized
            .remaining_fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_title_ignores_values() {
        let row = Row::new().with("Name", "title").with("Other", "x");
        assert_eq!(RowNormalizer::new().title_field(&row), Some("Name"));
    }

    #[test]
    fn test_title_case_insensitive() {
        let row = Row::new().with("id", 7.0).with("SUBTITLE", "Sub");
        let normalized = RowNormalizer::new().normalize(&row, "Slide 1");
        assert_eq!(normalized.title_field.as_deref(), Some("SUBTITLE"));
        assert_eq!(normalized.title_text, "Sub");
    }

    #[test]
    fn test_first_field_when_no_title() {
        let row = Row::new().with("Foo", "x");
        let normalized = RowNormalizer::new().normalize(&row, "Slide 1");
        assert_eq!(normalized.title_field.as_deref(), Some("Foo"));
        assert_eq!(normalized.title_text, "x");
        assert!(normalized.remaining_fields.is_empty());
    }

    #[test]
    fn test_empty_row_uses_fallback() {
        let normalized = RowNormalizer::new().normalize(&Row::new(), "Slide 4");
        assert_eq!(normalized.title_field, None);
        assert_eq!(normalized.title_text, "Slide 4");
        assert!(normalized.remaining_fields.is_empty());
    }

    #[test]
    fn test_empty_title_value_uses_fallback() {
        let row = Row::new().with("Title", CellValue::Empty).with("A", "1");
        let normalized = RowNormalizer::new().normalize(&row, "Slide 2");
        assert_eq!(normalized.title_field.as_deref(), Some("Title"));
        assert_eq!(normalized.title_text, "Slide 2");
    }

    #[test]
    fn test_empty_values_kept() {
        let row = Row::new()
            .with("Title", "T")
            .with("Empty", CellValue::Empty)
            .with("Full", "v");
        let normalized = RowNormalizer::new().normalize(&row, "Slide 1");
        assert_eq!(
            normalized.remaining_fields,
            vec![
                Field {
                    name: "Empty".to_string(),
                    display_value: String::new()
                },
                Field {
                    name: "Full".to_string(),
                    display_value: "v".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_display_value_policy() {
        assert_eq!(display_value(&CellValue::Empty), "");
        assert_eq!(display_value(&CellValue::from("text")), "text");
        assert_eq!(display_value(&CellValue::Number(42.0)), "42");
        assert_eq!(display_value(&CellValue::Number(-3.0)), "-3");
        assert_eq!(display_value(&CellValue::Number(0.1)), "0.1");
        assert_eq!(display_value(&CellValue::Number(1234.5)), "1234.5");
        assert_eq!(display_value(&CellValue::Number(f64::NAN)), "NaN");
        assert_eq!(
            display_value(&CellValue::Number(f64::NEG_INFINITY)),
            "-Infinity"
        );
        assert_eq!(display_value(&CellValue::Bool(true)), "TRUE");
        assert_eq!(display_value(&CellValue::Bool(false)), "FALSE");

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(display_value(&CellValue::Date(date)), "2024-03-01");
        let dt = date.and_hms_opt(9, 30, 0).unwrap();
        assert_eq!(display_value(&CellValue::DateTime(dt)), "2024-03-01T09:30:00");
    }
}
