//! XML text helpers shared by the part writers.

use quick_xml::escape::escape;
use sheetdeck_core::{Error, Result};

/// Relationship ID of the slide layout in every slide's rels.
pub(crate) const LAYOUT_REL_ID: &str = "rId1";

/// Relationship ID of the shared background image in every slide's rels.
pub(crate) const IMAGE_REL_ID: &str = "rId2";

pub(crate) const XML_DECLARATION: &str =
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub(crate) const NS_MAIN: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const NS_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const NS_PML: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

/// Map a `fmt::Write` failure into a serialization error.
pub(crate) fn fmt_error(e: std::fmt::Error) -> Error {
    Error::SerializationError(e.to_string())
}

/// Whether a character may appear in an XML 1.0 document.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || (c >= '\u{20}' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

/// Escape text for element content or attribute values, dropping characters
/// XML cannot carry.
pub(crate) fn escape_text(text: &str) -> String {
    if text.chars().all(is_xml_char) {
        escape(text).into_owned()
    } else {
        let cleaned: String = text.chars().filter(|&c| is_xml_char(c)).collect();
        escape(&cleaned).into_owned()
    }
}

/// Split text into lines, treating `\r\n`, `\r` and `\n` alike.
pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::to_string)
        .collect()
}

/// Validate a 6-digit hex color before it lands in an attribute.
pub(crate) fn hex_color(color: &str) -> Result<&str> {
    if color.len() == 6 && color.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(color)
    } else {
        Err(Error::SerializationError(format!("invalid color '{}'", color)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("A & B <c>"), "A &amp; B &lt;c&gt;");
        assert_eq!(escape_text("bell\u{7}char"), "bellchar");
        assert_eq!(escape_text("tab\tok"), "tab\tok");
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\r\nb\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("single"), vec!["single"]);
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("1CB5E0").unwrap(), "1CB5E0");
        assert!(hex_color("#1CB5E0").is_err());
        assert!(hex_color("red").is_err());
    }
}
