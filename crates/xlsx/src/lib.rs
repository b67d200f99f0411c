//! XLSX (Office Open XML) row reader.
//!
//! Reads the first worksheet of an .xlsx workbook into header-keyed rows.

pub mod dates;
pub mod reader;

pub use reader::XlsxReader;
