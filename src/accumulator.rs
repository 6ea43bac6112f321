//! Per-table row caps and the running record total for one extraction.

use log::debug;

use crate::model::{Row, TableData};

#[derive(Debug)]
pub struct RowAccumulator {
    limit: usize,
    total_records: usize,
}

impl RowAccumulator {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            total_records: 0,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Opens a sink for one table, capped at this accumulator's limit.
    pub fn table(&self, name: &str, columns: Vec<String>) -> TableRows {
        TableRows {
            name: name.to_string(),
            limit: self.limit,
            data: TableData {
                columns,
                rows: Vec::new(),
                truncated: false,
            },
        }
    }

    /// Folds a finished table into the running total and hands back its rows.
    pub fn finish(&mut self, table: TableRows) -> TableData {
        self.total_records += table.data.rows.len();
        debug!(
            "Captured {} row(s) for table '{}'",
            table.data.rows.len(),
            table.name
        );
        table.data
    }

    /// Records a table whose rows were collected elsewhere.
    pub fn record(&mut self, rows: usize) {
        self.total_records += rows;
    }

    pub fn total_records(&self) -> usize {
        self.total_records
    }
}

/// Row sink for a single table.
#[derive(Debug)]
pub struct TableRows {
    name: String,
    limit: usize,
    data: TableData,
}

impl TableRows {
    /// Accepts `row` unless the cap is already reached. Returns `false` once
    /// the table is full, at which point the caller should stop scanning it.
    pub fn push(&mut self, row: Row) -> bool {
        if self.is_full() {
            self.data.truncated = true;
            return false;
        }
        self.data.rows.push(row);
        !self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.data.rows.len() >= self.limit
    }

    /// Marks the table as cut short by the cap.
    pub fn mark_truncated(&mut self) {
        self.data.truncated = true;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.data.columns
    }

    pub fn len(&self) -> usize {
        self.data.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.rows.is_empty()
    }
}
