use std::{collections::HashSet, io::Cursor, str::Utf8Error};

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use shared::{
    domain::{CellValue, Table},
    error::{ErrorCode, TableError},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file name '{0}' names neither a csv nor an xls file")]
    UnrecognizedFileKind(String),
    #[error("file is not valid UTF-8: {0}")]
    Encoding(#[from] Utf8Error),
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line} has {found} fields, expected {expected}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("no columns to parse from file")]
    Empty,
    #[error(transparent)]
    Shape(#[from] TableError),
}

impl ParseError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ParseError::UnrecognizedFileKind(_) => ErrorCode::UnrecognizedFileKind,
            _ => ErrorCode::ParseFailure,
        }
    }
}

/// How the bytes of an upload are read, chosen from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Workbook,
}

impl FileKind {
    /// Case-sensitive substring match anywhere in the name; `"csv"` is
    /// checked before `"xls"`, so `csvbackup.xls` reads as CSV.
    pub fn sniff(filename: &str) -> Option<Self> {
        if filename.contains("csv") {
            Some(FileKind::Csv)
        } else if filename.contains("xls") {
            Some(FileKind::Workbook)
        } else {
            None
        }
    }
}

pub fn parse(bytes: &[u8], filename: &str) -> Result<Table, ParseError> {
    let kind = FileKind::sniff(filename)
        .ok_or_else(|| ParseError::UnrecognizedFileKind(filename.to_string()))?;
    let table = match kind {
        FileKind::Csv => parse_csv(bytes)?,
        FileKind::Workbook => parse_workbook(bytes)?,
    };
    debug!(
        filename,
        ?kind,
        columns = table.columns().len(),
        rows = table.row_count(),
        "parsed upload"
    );
    Ok(table)
}

/// Comma-separated UTF-8 text, header on the first row. Blank lines are
/// skipped and short rows are padded with empty cells.
pub fn parse_csv(bytes: &[u8]) -> Result<Table, ParseError> {
    let text = std::str::from_utf8(bytes)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(ParseError::Empty);
    }
    let width = headers.len();

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() == 1 && record[0].is_empty() && width > 1 {
            continue;
        }
        if record.len() > width {
            return Err(ParseError::RaggedRow {
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                expected: width,
                found: record.len(),
            });
        }
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(width, String::new());
        raw_rows.push(cells);
    }

    let kinds: Vec<ColumnKind> = (0..width)
        .map(|column| ColumnKind::infer(raw_rows.iter().map(|row| row[column].as_str())))
        .collect();
    let rows = raw_rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&kinds)
                .map(|(raw, kind)| kind.cell(raw))
                .collect()
        })
        .collect();

    Ok(Table::new(unique_column_names(headers), rows)?)
}

/// First worksheet of any workbook format calamine recognises, header on the
/// first row.
pub fn parse_workbook(bytes: &[u8]) -> Result<Table, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook.worksheet_range_at(0).ok_or(ParseError::Empty)??;

    let mut rows = range.rows();
    let header = rows.next().ok_or(ParseError::Empty)?;
    let headers: Vec<String> = header
        .iter()
        .map(|cell| match cell {
            Data::Empty => String::new(),
            other => other.to_string(),
        })
        .collect();
    if headers.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut rows: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(workbook_cell).collect())
        .collect();
    for column in 0..headers.len() {
        settle_whole_numbers(&mut rows, column);
    }
    Ok(Table::new(unique_column_names(headers), rows)?)
}

/// Workbooks store every number as a float. Whole floats become integers
/// unless the column is purely numeric with blanks, which keeps it float.
fn settle_whole_numbers(rows: &mut [Vec<CellValue>], column: usize) {
    let cells = || rows.iter().filter_map(|row| row.get(column));
    let numeric = cells().all(|cell| {
        matches!(cell, CellValue::Empty | CellValue::Int(_) | CellValue::Float(_))
    });
    let has_blank = cells().any(CellValue::is_empty);
    if numeric && has_blank {
        return;
    }
    for cell in rows.iter_mut().filter_map(|row| row.get_mut(column)) {
        if let CellValue::Float(v) = *cell {
            if let Some(whole) = whole_number(v) {
                *cell = CellValue::Int(whole);
            }
        }
    }
}

fn whole_number(v: f64) -> Option<i64> {
    (v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64).then(|| v as i64)
}

fn workbook_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::Bool(v) => CellValue::Bool(*v),
        Data::Int(v) => CellValue::Int(*v),
        Data::Float(v) => CellValue::Float(*v),
        Data::String(v) => CellValue::Text(v.clone()),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(cell.to_string())),
        other => CellValue::Text(other.to_string()),
    }
}

/// Blank names become `Unnamed: <index>`; repeats get `.1`, `.2`, ... suffixes.
fn unique_column_names(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let base = if name.trim().is_empty() {
                format!("Unnamed: {index}")
            } else {
                name
            };
            let mut candidate = base.clone();
            let mut suffix = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{base}.{suffix}");
                suffix += 1;
            }
            candidate
        })
        .collect()
}

/// A CSV column is numeric or boolean only if every non-blank cell is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Text,
}

impl ColumnKind {
    fn infer<'a>(cells: impl Iterator<Item = &'a str>) -> Self {
        let mut kind: Option<ColumnKind> = None;
        for raw in cells.map(str::trim).filter(|raw| !raw.is_empty()) {
            let cell_kind = if raw.parse::<i64>().is_ok() {
                ColumnKind::Int
            } else if raw.parse::<f64>().is_ok() {
                ColumnKind::Float
            } else if parse_bool(raw).is_some() {
                ColumnKind::Bool
            } else {
                return ColumnKind::Text;
            };
            kind = Some(match (kind, cell_kind) {
                (None, k) => k,
                (Some(a), b) if a == b => a,
                (Some(ColumnKind::Int), ColumnKind::Float)
                | (Some(ColumnKind::Float), ColumnKind::Int) => ColumnKind::Float,
                _ => return ColumnKind::Text,
            });
        }
        kind.unwrap_or(ColumnKind::Text)
    }

    fn cell(self, raw: &str) -> CellValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        let parsed = match self {
            ColumnKind::Int => trimmed.parse().ok().map(CellValue::Int),
            ColumnKind::Float => trimmed.parse().ok().map(CellValue::Float),
            ColumnKind::Bool => parse_bool(trimmed).map(CellValue::Bool),
            ColumnKind::Text => None,
        };
        parsed.unwrap_or_else(|| CellValue::Text(raw.to_string()))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/parse_tests.rs"]
mod tests;
