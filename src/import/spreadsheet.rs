//! Decodes uploaded spreadsheet bytes into header-keyed rows.
//!
//! The first row is the header row. Blank lines are dropped, blank cells
//! become `null`, and only the first sheet of a workbook is read.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::{ReaderBuilder, Trim};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Csv,
    /// Anything calamine opens: xlsx, xlsm, xlsb, xls, ods
    Workbook,
}

impl SpreadsheetFormat {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(SpreadsheetFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SpreadsheetFormat::Workbook),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum SpreadsheetError {
    UnsupportedFormat(String),
    Malformed(String),
}

impl fmt::Display for SpreadsheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadsheetError::UnsupportedFormat(name) => write!(f, "Unsupported spreadsheet type: {}", name),
            SpreadsheetError::Malformed(msg) => write!(f, "Could not read spreadsheet: {}", msg),
        }
    }
}

impl std::error::Error for SpreadsheetError {}

/// Decodes a file by its name's extension.
pub fn decode_file(file_name: &str, bytes: &[u8]) -> Result<Vec<Value>, SpreadsheetError> {
    let format = SpreadsheetFormat::from_file_name(file_name)
        .ok_or_else(|| SpreadsheetError::UnsupportedFormat(file_name.to_string()))?;
    decode(format, bytes)
}

pub fn decode(format: SpreadsheetFormat, bytes: &[u8]) -> Result<Vec<Value>, SpreadsheetError> {
    match format {
        SpreadsheetFormat::Csv => decode_csv(bytes),
        SpreadsheetFormat::Workbook => decode_workbook(bytes),
    }
}

fn decode_csv(bytes: &[u8]) -> Result<Vec<Value>, SpreadsheetError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| SpreadsheetError::Malformed(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SpreadsheetError::Malformed(e.to_string()))?;
        let cells = record.iter().map(|cell| {
            if cell.is_empty() {
                Value::Null
            } else {
                Value::String(cell.to_string())
            }
        });
        if let Some(row) = build_row(&headers, cells) {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn decode_workbook(bytes: &[u8]) -> Result<Vec<Value>, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SpreadsheetError::Malformed(e.to_string()))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| SpreadsheetError::Malformed(e.to_string()))?,
        None => return Ok(Vec::new()),
    };

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header_row) => header_row.iter().map(|cell| cell.to_string().trim().to_string()).collect(),
        None => return Ok(Vec::new()),
    };

    Ok(sheet_rows
        .filter_map(|cells| build_row(&headers, cells.iter().map(cell_value)))
        .collect())
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Value::Null
            } else {
                Value::String(s.to_string())
            }
        }
        // Whole floats (phone numbers, counts) come back as integers
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => Value::from(*n as i64),
        Data::Float(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
        Data::Int(n) => Value::from(*n),
        Data::Bool(b) => Value::Bool(*b),
        other => Value::String(other.to_string()),
    }
}

/// Zips a header row with cells. Returns `None` for rows with no content.
/// Columns with a blank header are dropped; a repeated header keeps its
/// first column.
fn build_row<I>(headers: &[String], cells: I) -> Option<Value>
where
    I: Iterator<Item = Value>,
{
    let mut map = Map::new();
    let mut has_content = false;
    for (header, value) in headers.iter().zip(cells) {
        if header.is_empty() || map.contains_key(header) {
            continue;
        }
        has_content |= !value.is_null();
        map.insert(header.clone(), value);
    }
    has_content.then_some(Value::Object(map))
}
