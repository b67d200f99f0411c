//! XLSX workbook reader implementation.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sheetdeck_core::{display_value, CellValue, Error, Result, Row};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::dates::{is_date_format, serial_to_value};

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";
const STYLES_PATH: &str = "xl/styles.xml";

/// Number of columns in a worksheet (`A` through `XFD`).
const MAX_COLUMNS: usize = 16_384;

/// Header used for columns without a name.
const EMPTY_HEADER: &str = "__EMPTY";

/// Reader for the first worksheet of XLSX (Office Open XML) workbooks.
pub struct XlsxReader;

impl XlsxReader {
    /// Create a new XLSX reader.
    pub fn new() -> Self {
        Self
    }

    /// Read the first worksheet as rows keyed by the header row.
    ///
    /// Blank data rows are skipped. Every row carries one field per column
    /// of the used range, in column order; missing cells are `Empty`.
    pub fn read_rows<R: Read + Seek>(&self, reader: R) -> Result<Vec<Row>> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::SpreadsheetError(format!("Failed to open ZIP: {}", e)))?;

        let workbook = self.read_workbook(&mut archive)?;
        log::debug!(
            "First sheet '{}' at {} (date1904: {})",
            workbook.sheet_name,
            workbook.sheet_path,
            workbook.date1904
        );

        let shared_strings = match self.read_optional_file(&mut archive, SHARED_STRINGS_PATH)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };
        let styles = match self.read_optional_file(&mut archive, STYLES_PATH)? {
            Some(xml) => parse_date_styles(&xml)?,
            None => DateStyles::default(),
        };

        let sheet_xml = self.read_file_from_archive(&mut archive, &workbook.sheet_path)?;
        let context = CellContext {
            shared_strings: &shared_strings,
            styles: &styles,
            date1904: workbook.date1904,
        };
        let grid = parse_sheet(&sheet_xml, &context)?;

        let rows = rows_from_grid(grid);
        log::debug!("Read {} rows from '{}'", rows.len(), workbook.sheet_name);
        Ok(rows)
    }

    /// Locate the first sheet and the workbook date system.
    fn read_workbook<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<WorkbookInfo> {
        let content = self.read_file_from_archive(archive, WORKBOOK_PATH)?;
        let mut reader = Reader::from_str(&content);
        reader.trim_text(true);

        let mut date1904 = false;
        let mut first_sheet: Option<(String, String)> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                    b"workbookPr" => {
                        if let Some(value) = attribute(e, b"date1904") {
                            date1904 = value == "1" || value.eq_ignore_ascii_case("true");
                        }
                    }
                    b"sheet" if first_sheet.is_none() => {
                        let name = attribute(e, b"name").unwrap_or_default();
                        let rel_id = relationship_id(e).ok_or_else(|| {
                            Error::SpreadsheetError(format!("Sheet '{}' has no relationship id", name))
                        })?;
                        first_sheet = Some((name, rel_id));
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::SpreadsheetError(format!("Error parsing workbook: {}", e)));
                }
                _ => {}
            }
        }

        let (sheet_name, rel_id) =
            first_sheet.ok_or_else(|| Error::SpreadsheetError("Workbook has no sheets".to_string()))?;
        let sheet_path = self.resolve_sheet_target(archive, &rel_id)?;

        Ok(WorkbookInfo {
            sheet_name,
            sheet_path,
            date1904,
        })
    }

    /// Resolve a workbook relationship ID into a package path.
    fn resolve_sheet_target<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        rel_id: &str,
    ) -> Result<String> {
        let content = self.read_file_from_archive(archive, WORKBOOK_RELS_PATH)?;
        let mut reader = Reader::from_str(&content);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    if attribute(e, b"Id").as_deref() != Some(rel_id) {
                        continue;
                    }
                    let target = attribute(e, b"Target").unwrap_or_default();
                    let full_path = if let Some(absolute) = target.strip_prefix('/') {
                        absolute.to_string()
                    } else {
                        format!("xl/{}", target)
                    };
                    return Ok(full_path);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::SpreadsheetError(format!(
                        "Error parsing workbook relationships: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        Err(Error::SpreadsheetError(format!(
            "Relationship '{}' not found for first sheet",
            rel_id
        )))
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        self.read_optional_file(archive, path)?.ok_or_else(|| {
            Error::SpreadsheetError(format!("File not found in archive '{}'", path))
        })
    }

    /// Read a file from the ZIP archive, `None` when it does not exist.
    fn read_optional_file<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<Option<String>> {
        let mut file = match archive.by_name(path) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(Error::SpreadsheetError(format!("Failed to open '{}': {}", path, e)));
            }
        };

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::SpreadsheetError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(Some(content))
    }
}

impl Default for XlsxReader {
    fn default() -> Self {
        Self::new()
    }
}

/// What the reader needs from `xl/workbook.xml`.
#[derive(Debug)]
struct WorkbookInfo {
    sheet_name: String,
    sheet_path: String,
    date1904: bool,
}

/// Which cell style indices carry a date number format.
#[derive(Debug, Default)]
struct DateStyles {
    xf_is_date: Vec<bool>,
}

impl DateStyles {
    fn is_date(&self, style_index: Option<usize>) -> bool {
        style_index
            .and_then(|i| self.xf_is_date.get(i).copied())
            .unwrap_or(false)
    }
}

/// Lookups needed to turn raw cells into values.
struct CellContext<'a> {
    shared_strings: &'a [String],
    styles: &'a DateStyles,
    date1904: bool,
}

/// A cell as found in the sheet XML, before typing.
#[derive(Debug, Default)]
struct RawCell {
    column: usize,
    cell_type: Option<String>,
    style: Option<usize>,
    text: String,
}

/// Read an attribute value by its exact name.
fn attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .map(|attr| {
            attr.unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string())
        })
}

/// The `r:id` attribute, whatever prefix the relationships namespace uses.
fn relationship_id(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id")
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Parse `xl/sharedStrings.xml`. Rich-text runs are concatenated; phonetic
/// runs are skipped.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let mut reader = Reader::from_str(xml);

    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => in_text = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                current.push_str(&e.unescape().unwrap_or_default());
            }
            Ok(Event::CData(ref e)) if in_text => {
                current.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::SpreadsheetError(format!(
                    "Error parsing shared strings: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(strings)
}

/// Parse `xl/styles.xml` into per-style date flags.
fn parse_date_styles(xml: &str) -> Result<DateStyles> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut custom_formats: HashMap<u32, String> = HashMap::new();
    let mut xf_format_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"cellXfs" => {
                in_cell_xfs = true;
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"numFmt" => {
                    let id = attribute(e, b"numFmtId").and_then(|v| v.parse().ok());
                    if let (Some(id), Some(code)) = (id, attribute(e, b"formatCode")) {
                        custom_formats.insert(id, code);
                    }
                }
                b"xf" if in_cell_xfs => {
                    let id = attribute(e, b"numFmtId")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                    xf_format_ids.push(id);
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"cellXfs" => {
                in_cell_xfs = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::SpreadsheetError(format!("Error parsing styles: {}", e)));
            }
            _ => {}
        }
    }

    let xf_is_date = xf_format_ids
        .into_iter()
        .map(|id| is_date_format(id, custom_formats.get(&id).map(String::as_str)))
        .collect();

    Ok(DateStyles { xf_is_date })
}

/// Parse the worksheet into rows of `(column, value)` pairs, in document order.
fn parse_sheet(xml: &str, context: &CellContext<'_>) -> Result<Vec<Vec<(usize, CellValue)>>> {
    let mut rows = Vec::new();
    let mut reader = Reader::from_str(xml);

    let mut current_row: Vec<(usize, CellValue)> = Vec::new();
    let mut current_cell: Option<RawCell> = None;
    let mut next_column = 0usize;
    let mut in_value = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"row" => {
                    current_row.clear();
                    next_column = 0;
                }
                b"c" => {
                    let cell = raw_cell(e, next_column)?;
                    next_column = cell.column + 1;
                    current_cell = Some(cell);
                }
                b"v" => in_value = true,
                b"rPh" => in_phonetic = true,
                b"t" if current_cell.is_some() && !in_phonetic => in_value = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"c" => {
                // Styled but valueless cell
                next_column = raw_cell(e, next_column)?.column + 1;
            }
            Ok(Event::Text(ref e)) if in_value => {
                if let Some(cell) = current_cell.as_mut() {
                    cell.text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"rPh" => in_phonetic = false,
                b"c" => {
                    if let Some(cell) = current_cell.take() {
                        let value = cell_value(&cell, context)?;
                        if !value.is_empty() {
                            current_row.push((cell.column, value));
                        }
                    }
                }
                b"row" => rows.push(std::mem::take(&mut current_row)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::SpreadsheetError(format!("Error parsing worksheet: {}", e)));
            }
            _ => {}
        }
    }

    Ok(rows)
}

fn raw_cell(e: &BytesStart, next_column: usize) -> Result<RawCell> {
    let column = match attribute(e, b"r") {
        Some(r) => column_index(&r)?.unwrap_or(next_column),
        None => next_column,
    };
    if column >= MAX_COLUMNS {
        return Err(Error::SpreadsheetError(format!(
            "Cell column {} is past the last worksheet column",
            column + 1
        )));
    }

    Ok(RawCell {
        column,
        cell_type: attribute(e, b"t"),
        style: attribute(e, b"s").and_then(|s| s.parse().ok()),
        text: String::new(),
    })
}

/// Type a raw cell according to its `t` attribute and style.
fn cell_value(cell: &RawCell, context: &CellContext<'_>) -> Result<CellValue> {
    let text = cell.text.as_str();

    let value = match cell.cell_type.as_deref() {
        Some("s") => {
            let index: usize = text.trim().parse().map_err(|_| {
                Error::SpreadsheetError(format!("Invalid shared string index '{}'", text))
            })?;
            let shared = context.shared_strings.get(index).ok_or_else(|| {
                Error::SpreadsheetError(format!("Shared string {} out of range", index))
            })?;
            text_value(shared)
        }
        Some("str") | Some("inlineStr") | Some("e") => text_value(text),
        Some("b") => match text.trim() {
            "" => CellValue::Empty,
            v => CellValue::Bool(v == "1" || v.eq_ignore_ascii_case("true")),
        },
        Some("d") => iso_date_value(text.trim()),
        _ => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                CellValue::Empty
            } else {
                match trimmed.parse::<f64>() {
                    Ok(n) if context.styles.is_date(cell.style) => {
                        serial_to_value(n, context.date1904).unwrap_or(CellValue::Number(n))
                    }
                    Ok(n) => CellValue::Number(n),
                    Err(_) => text_value(trimmed),
                }
            }
        }
    };

    Ok(value)
}

fn text_value(text: &str) -> CellValue {
    if text.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(text.to_string())
    }
}

/// Parse an ISO-8601 date cell (`t="d"`).
fn iso_date_value(text: &str) -> CellValue {
    use chrono::{NaiveDate, NaiveDateTime};

    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return CellValue::DateTime(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.fZ") {
        return CellValue::DateTime(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return CellValue::Date(date);
    }
    text_value(text)
}

/// Build header-keyed rows from the raw grid.
///
/// The first non-empty row is the header. Columns span the used range;
/// unnamed columns become `__EMPTY`, repeated names get `_1`, `_2`, ...
fn rows_from_grid(grid: Vec<Vec<(usize, CellValue)>>) -> Vec<Row> {
    let mut grid = grid.into_iter().filter(|row| !row.is_empty());

    let Some(header_row) = grid.next() else {
        return Vec::new();
    };
    let data_rows: Vec<Vec<(usize, CellValue)>> = grid.collect();

    let columns = std::iter::once(&header_row)
        .chain(data_rows.iter())
        .flat_map(|row| row.iter().map(|(col, _)| *col));
    let (Some(first_column), Some(last_column)) = (columns.clone().min(), columns.max()) else {
        return Vec::new();
    };

    let header_values: HashMap<usize, &CellValue> =
        header_row.iter().map(|(col, value)| (*col, value)).collect();
    let headers = unique_headers((first_column..=last_column).map(|col| {
        header_values
            .get(&col)
            .map(|value| display_value(value))
            .filter(|name| !name.is_empty())
    }));

    data_rows
        .into_iter()
        .map(|cells| {
            let mut values: HashMap<usize, CellValue> = cells.into_iter().collect();
            headers
                .iter()
                .zip(first_column..=last_column)
                .map(|(name, col)| (name.clone(), values.remove(&col).unwrap_or(CellValue::Empty)))
                .collect()
        })
        .collect()
}

/// Fill in names for unnamed columns and de-duplicate repeated ones.
fn unique_headers(names: impl Iterator<Item = Option<String>>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();

    for name in names {
        let base = name.unwrap_or_else(|| EMPTY_HEADER.to_string());
        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

/// Zero-based column index from a cell reference like "B7" or "AA10".
///
/// `None` when the reference has no column letters. References past
/// column `XFD` are an error.
fn column_index(cell_ref: &str) -> Result<Option<usize>> {
    let letters = cell_ref
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .map(|b| b.to_ascii_uppercase());

    let mut index = 0usize;
    let mut any = false;
    for b in letters {
        any = true;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add((b - b'A' + 1) as usize))
            .filter(|&i| i <= MAX_COLUMNS)
            .ok_or_else(|| {
                Error::SpreadsheetError(format!("Cell reference '{}' is out of range", cell_ref))
            })?;
    }

    Ok(any.then(|| index - 1))
}
