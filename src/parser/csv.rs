//! Delimited-text strategy of the tabular parser.

use std::sync::Arc;

use ::csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;

use super::{CellValue, Discovery, ParseOptions, ParsedTable, Row, distinct_headers};
use crate::{error::MapperError, error::Result, source::SourceFile};

const DELIMITER_CANDIDATES: &[u8] = b",;\t|";

pub fn discover(file: &SourceFile, options: &ParseOptions) -> Result<Discovery> {
    let mut row_count = 0usize;
    let columns = scan(file, options, |row| {
        if !row.is_blank() {
            row_count += 1;
        }
    })?;
    Ok(Discovery {
        columns: columns.to_vec(),
        row_count,
    })
}

pub fn read_table(file: &SourceFile, options: &ParseOptions) -> Result<ParsedTable> {
    let mut rows = Vec::new();
    let columns = scan(file, options, |row| {
        if !row.is_blank() {
            rows.push(row);
        }
    })?;
    Ok(ParsedTable::new(columns, rows))
}

/// Decodes the file, reads the header and hands every data row to `visit`.
fn scan<F>(file: &SourceFile, options: &ParseOptions, mut visit: F) -> Result<Arc<[String]>>
where
    F: FnMut(Row),
{
    let text = decode(file, options)?;
    let delimiter = options
        .delimiter
        .unwrap_or_else(|| guess_delimiter(&text));
    debug!(
        "Reading '{}' with delimiter {:?}",
        file.name(),
        delimiter as char
    );

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .trim(Trim::None)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| MapperError::parse(file.name(), err))?
        .iter()
        .map(|name| name.to_string())
        .collect::<Vec<_>>();
    let columns: Arc<[String]> = distinct_headers(headers).into();

    let mut record = StringRecord::new();
    loop {
        let more = reader
            .read_record(&mut record)
            .map_err(|err| MapperError::parse(file.name(), err))?;
        if !more {
            break;
        }
        let values = record
            .iter()
            .map(|field| CellValue::Text(field.to_string()))
            .collect();
        visit(Row::new(Arc::clone(&columns), values));
    }
    Ok(columns)
}

fn decode(file: &SourceFile, options: &ParseOptions) -> Result<String> {
    let (text, used, had_errors) = options.encoding.decode(file.bytes());
    if had_errors {
        return Err(MapperError::parse(
            file.name(),
            format!("input is not valid {}", used.name()),
        ));
    }
    Ok(text.into_owned())
}

/// Picks the candidate delimiter that occurs most often on the header line,
/// the first non-empty one since the reader skips empty lines.
pub(crate) fn guess_delimiter(text: &str) -> u8 {
    let first_line = text.lines().find(|line| !line.is_empty()).unwrap_or_default();
    let mut best = b',';
    let mut best_count = 0usize;
    for &candidate in DELIMITER_CANDIDATES {
        let count = first_line
            .bytes()
            .filter(|byte| *byte == candidate)
            .count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}
