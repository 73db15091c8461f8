//! Tabular parser: turns an uploaded CSV or Excel file into one canonical
//! column/row model.
//!
//! Two modes are supported. [`ParseMode::Discovery`] only reports the ordered
//! column names and the number of data rows, which is all a mapping session
//! needs. [`ParseMode::Full`] materialises every row as a [`Row`] keyed by the
//! table's header list.
//!
//! Dispatch is by [`FileFormat`], one strategy per variant:
//!
//! - CSV: first row is the header, blank lines are skipped and rows whose
//!   fields are all empty are dropped from both the count and the rows.
//! - Spreadsheet: only the first sheet is read. Discovery counts every row
//!   below the header (`max(total_rows - 1, 0)`); full mode fills missing
//!   cells with an empty string.

pub mod csv;
pub mod spreadsheet;

use std::{collections::HashSet, fmt, sync::Arc};

use encoding_rs::{Encoding, UTF_8};
use log::debug;
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    error::Result,
    source::{FileFormat, SourceFile},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Discovery,
    Full,
}

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// CSV delimiter; guessed from the header line when `None`.
    pub delimiter: Option<u8>,
    /// Text encoding for CSV input. A byte-order mark takes precedence.
    pub encoding: &'static Encoding,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

/// A single cell as emitted by the underlying reader, without conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
}

impl CellValue {
    /// Missing cells and empty strings are blank; whitespace is not.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Integer(value) => value.to_string(),
            CellValue::Number(value) => {
                if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                    (*value as i64).to_string()
                } else {
                    value.to_string()
                }
            }
            CellValue::Boolean(value) => value.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_display())
    }
}

/// One record of a parsed table. Values are positionally aligned with the
/// header list shared by every row of the same table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<CellValue>,
}

impl Row {
    pub(crate) fn new(columns: Arc<[String]>, mut values: Vec<CellValue>) -> Self {
        values.resize(columns.len(), CellValue::Empty);
        Self { columns, values }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.columns
            .iter()
            .map(|name| name.as_str())
            .zip(self.values.iter())
    }

    pub fn is_blank(&self) -> bool {
        self.values.iter().all(CellValue::is_blank)
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Column names and data-row count, without the rows themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discovery {
    pub columns: Vec<String>,
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    columns: Arc<[String]>,
    rows: Vec<Row>,
}

impl ParsedTable {
    pub(crate) fn new(columns: Arc<[String]>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn discovery(&self) -> Discovery {
        Discovery {
            columns: self.columns.to_vec(),
            row_count: self.rows.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Discovery(Discovery),
    Full(ParsedTable),
}

impl Parsed {
    pub fn columns(&self) -> &[String] {
        match self {
            Parsed::Discovery(discovery) => &discovery.columns,
            Parsed::Full(table) => table.columns(),
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            Parsed::Discovery(discovery) => discovery.row_count,
            Parsed::Full(table) => table.row_count(),
        }
    }
}

pub fn parse(file: &SourceFile, mode: ParseMode, options: &ParseOptions) -> Result<Parsed> {
    debug!("Parsing '{}' in {:?} mode", file.name(), mode);
    let parsed = match mode {
        ParseMode::Discovery => Parsed::Discovery(discover(file, options)?),
        ParseMode::Full => Parsed::Full(read_table(file, options)?),
    };
    debug!(
        "Parsed '{}': {} column(s), {} row(s)",
        file.name(),
        parsed.columns().len(),
        parsed.row_count()
    );
    Ok(parsed)
}

/// Column names plus the data row count, without keeping any rows.
pub fn discover(file: &SourceFile, options: &ParseOptions) -> Result<Discovery> {
    match file.format()? {
        FileFormat::Csv => csv::discover(file, options),
        FileFormat::Spreadsheet(kind) => spreadsheet::discover(file, kind),
    }
}

/// Every non-blank data row, each keyed by the header names.
pub fn read_table(file: &SourceFile, options: &ParseOptions) -> Result<ParsedTable> {
    match file.format()? {
        FileFormat::Csv => csv::read_table(file, options),
        FileFormat::Spreadsheet(kind) => spreadsheet::read_table(file, kind),
    }
}

/// Makes repeated header names distinct by suffixing `_1`, `_2`, ... to later
/// occurrences.
pub(crate) fn distinct_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut headers = Vec::with_capacity(raw.len());
    for name in raw {
        if seen.insert(name.clone()) {
            headers.push(name);
            continue;
        }
        let mut suffix = 1usize;
        let unique = loop {
            let candidate = format!("{name}_{suffix}");
            if !seen.contains(&candidate) {
                break candidate;
            }
            suffix += 1;
        };
        seen.insert(unique.clone());
        headers.push(unique);
    }
    headers
}
