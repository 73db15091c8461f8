//! Plain-text tables for terminal listings and previews.

use std::borrow::Cow;
use std::fmt::Write as _;

const DEFAULT_MAX_CELL_WIDTH: usize = 40;

#[derive(Debug, Clone)]
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    max_cell_width: usize,
}

impl TextTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            max_cell_width: DEFAULT_MAX_CELL_WIDTH,
        }
    }

    pub fn with_max_cell_width(mut self, width: usize) -> Self {
        self.max_cell_width = width.max(1);
        self
    }

    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row = cells.into_iter().map(Into::into).collect::<Vec<String>>();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let headers = self.cells(&self.headers);
        let rows = self.rows.iter().map(|r| self.cells(r)).collect::<Vec<_>>();

        let mut widths = headers.iter().map(|h| width(h)).collect::<Vec<_>>();
        for row in &rows {
            for (idx, cell) in row.iter().enumerate() {
                widths[idx] = widths[idx].max(width(cell));
            }
        }
        let widths = widths.into_iter().map(|w| w.max(3)).collect::<Vec<_>>();

        let mut output = String::new();
        let _ = writeln!(output, "{}", line(&headers, &widths));
        let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
        let _ = writeln!(output, "{}", line(&rule, &widths));
        for row in &rows {
            let _ = writeln!(output, "{}", line(row, &widths));
        }
        output
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }

    fn cells(&self, raw: &[String]) -> Vec<String> {
        raw.iter()
            .map(|cell| clip(&flatten(cell), self.max_cell_width))
            .collect()
    }
}

fn line(cells: &[String], widths: &[usize]) -> String {
    let padded = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{cell}{}", " ".repeat(w.saturating_sub(width(cell)))))
        .collect::<Vec<_>>();
    padded.join("  ").trim_end().to_string()
}

fn width(value: &str) -> usize {
    value.chars().count()
}

fn flatten(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn clip(value: &str, max: usize) -> String {
    if width(value) <= max {
        return value.to_string();
    }
    let mut clipped = value.chars().take(max.saturating_sub(1)).collect::<String>();
    clipped.push('…');
    clipped
}
