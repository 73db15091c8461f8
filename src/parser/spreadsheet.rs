//! Spreadsheet strategy of the tabular parser.
//!
//! Only the first worksheet (by position) is read; every other sheet in the
//! workbook is ignored.

use std::{io::Cursor, sync::Arc};

use calamine::{Data, Range, Reader, Xls, Xlsx};
use log::{debug, warn};

use super::{CellValue, Discovery, ParsedTable, Row, distinct_headers};
use crate::{
    error::{MapperError, Result},
    source::{SourceFile, SpreadsheetKind},
};

const EMPTY_HEADER: &str = "__EMPTY";

pub fn discover(file: &SourceFile, kind: SpreadsheetKind) -> Result<Discovery> {
    let range = first_sheet(file, kind)?;
    let total_rows = range.height();
    let columns = range.rows().next().map(header_names).unwrap_or_default();
    Ok(Discovery {
        columns,
        row_count: total_rows.saturating_sub(1),
    })
}

pub fn read_table(file: &SourceFile, kind: SpreadsheetKind) -> Result<ParsedTable> {
    let range = first_sheet(file, kind)?;
    let mut sheet_rows = range.rows();
    let columns: Arc<[String]> = sheet_rows.next().map(header_names).unwrap_or_default().into();

    let mut rows = Vec::new();
    for cells in sheet_rows {
        if cells.iter().all(is_blank_cell) {
            continue;
        }
        let values = (0..columns.len())
            .map(|idx| cells.get(idx).map(cell_value).unwrap_or_else(empty_text))
            .collect();
        rows.push(Row::new(Arc::clone(&columns), values));
    }
    Ok(ParsedTable::new(columns, rows))
}

fn first_sheet(file: &SourceFile, kind: SpreadsheetKind) -> Result<Range<Data>> {
    let cursor = Cursor::new(file.bytes().to_vec());
    let sheet = match kind {
        SpreadsheetKind::Xlsx => {
            let mut workbook: Xlsx<_> =
                Xlsx::new(cursor).map_err(|err| MapperError::parse(file.name(), err))?;
            log_ignored_sheets(file, &workbook.sheet_names());
            workbook
                .worksheet_range_at(0)
                .transpose()
                .map_err(|err| MapperError::parse(file.name(), err))?
        }
        SpreadsheetKind::Xls => {
            let mut workbook: Xls<_> =
                Xls::new(cursor).map_err(|err| MapperError::parse(file.name(), err))?;
            log_ignored_sheets(file, &workbook.sheet_names());
            workbook
                .worksheet_range_at(0)
                .transpose()
                .map_err(|err| MapperError::parse(file.name(), err))?
        }
    };
    Ok(sheet.unwrap_or_else(Range::empty))
}

fn log_ignored_sheets(file: &SourceFile, names: &[String]) {
    match names {
        [] => warn!("Workbook '{}' has no sheets", file.name()),
        [first] => debug!("Reading sheet '{first}' of '{}'", file.name()),
        [first, rest @ ..] => debug!(
            "Reading sheet '{first}' of '{}'; ignoring {} other sheet(s)",
            file.name(),
            rest.len()
        ),
    }
}

fn header_names(cells: &[Data]) -> Vec<String> {
    let raw = cells
        .iter()
        .map(|cell| {
            let name = cell_value(cell).as_display();
            if name.is_empty() {
                EMPTY_HEADER.to_string()
            } else {
                name
            }
        })
        .collect();
    distinct_headers(raw)
}

fn is_blank_cell(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(text) => text.is_empty(),
        _ => false,
    }
}

fn empty_text() -> CellValue {
    CellValue::Text(String::new())
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => empty_text(),
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Int(value) => CellValue::Integer(*value),
        Data::Float(value) => CellValue::Number(*value),
        Data::Bool(value) => CellValue::Boolean(*value),
        Data::DateTime(value) => CellValue::Number(value.as_f64()),
        Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::Text(text.clone()),
        Data::Error(err) => CellValue::Text(err.to_string()),
    }
}
