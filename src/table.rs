//! Aligned plain-text rendering of extracted rows for the `preview` command.

use std::fmt::Write as _;

use crate::model::{Row, TableData};

const COLUMN_GAP: &str = "  ";
const MAX_CELL_WIDTH: usize = 40;

pub fn render_table(data: &TableData, rows: usize) -> String {
    let headers = data.headers();
    let body = data
        .rows
        .iter()
        .take(rows)
        .map(|row| row_cells(&headers, row))
        .collect::<Vec<_>>();

    let mut widths = headers.iter().map(|h| cell_width(h)).collect::<Vec<_>>();
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell_width(cell));
        }
    }
    let widths = widths
        .into_iter()
        .map(|w| w.clamp(3, MAX_CELL_WIDTH))
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(&headers, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_line(&rule, &widths));
    for cells in &body {
        let _ = writeln!(output, "{}", format_line(cells, &widths));
    }
    output
}

fn row_cells(headers: &[String], row: &Row) -> Vec<String> {
    headers
        .iter()
        .map(|key| row.get(key).map(|value| value.as_display()).unwrap_or_default())
        .collect()
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| {
            let flat = flatten(cell);
            let shown = truncate(&flat, width);
            let pad = width.saturating_sub(cell_width(&shown));
            format!("{shown}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    line.trim_end().to_string()
}

fn cell_width(value: &str) -> usize {
    value.chars().count()
}

fn flatten(value: &str) -> String {
    value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect()
}

fn truncate(value: &str, width: usize) -> String {
    if cell_width(value) <= width {
        return value.to_string();
    }
    let mut shown = value.chars().take(width.saturating_sub(1)).collect::<String>();
    shown.push('…');
    shown
}
