use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    cli::InspectArgs,
    io_utils,
    parser::{self, Row},
    source::SourceFile,
    table::TextTable,
};

#[derive(Debug, Serialize)]
struct InspectReport<'a> {
    file: &'a str,
    columns: &'a [String],
    row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<&'a [Row]>,
}

pub fn execute(args: &InspectArgs, max_file_size: u64) -> Result<()> {
    let options = io_utils::parse_options(&args.input)?;
    let path = &args.input.input;
    let file = SourceFile::open(path).with_context(|| format!("Opening upload {path:?}"))?;
    file.ensure_within(max_file_size)?;

    let discovery = parser::discover(&file, &options)
        .with_context(|| format!("Reading columns from {path:?}"))?;
    let preview = match args.rows {
        Some(limit) => {
            let table = parser::read_table(&file, &options)
                .with_context(|| format!("Reading rows from {path:?}"))?;
            let shown = table.rows().len().min(limit);
            Some((table, shown))
        }
        None => None,
    };

    let report = InspectReport {
        file: file.name(),
        columns: &discovery.columns,
        row_count: discovery.row_count,
        rows: preview.as_ref().map(|(table, shown)| &table.rows()[..*shown]),
    };
    if io_utils::print_structured(args.format, &report)? {
        return Ok(());
    }

    let mut columns = TextTable::new(["#", "column"]);
    for (idx, name) in discovery.columns.iter().enumerate() {
        columns.push_row([(idx + 1).to_string(), name.clone()]);
    }
    columns.print();
    println!("{} row(s)", discovery.row_count);

    if let Some(rows) = report.rows {
        println!();
        let mut table =
            TextTable::new(discovery.columns.iter().cloned()).with_max_cell_width(args.cell_width);
        for row in rows {
            table.push_row(row.values().iter().map(|v| v.as_display()));
        }
        table.print();
        info!("Previewed {} row(s) from {:?}", rows.len(), path);
    }
    Ok(())
}
