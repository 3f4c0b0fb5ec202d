//! Query results.

use std::collections::BTreeMap;
use std::io;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A column name to value mapping for one result row.
pub type Record = BTreeMap<String, Value>;

/// Columns and rows produced by one query execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the statement produced a result shape at all.
    pub fn has_columns(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Rows keyed by column name. Later duplicate column names win.
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// Header row followed by every row rendered as display strings.
    pub fn to_display_rows(&self) -> Vec<Vec<String>> {
        let mut out = Vec::with_capacity(self.rows.len() + 1);
        out.push(self.columns.clone());
        out.extend(
            self.rows
                .iter()
                .map(|row| row.iter().map(Value::to_display_string).collect()),
        );
        out
    }

    /// CSV with a header line.
    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for row in self.to_display_rows() {
            writer.write_record(&row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        String::from_utf8(bytes)
            .map_err(|e| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Plain-text table for terminal output.
    pub fn render_table(&self) -> String {
        let rows = self.to_display_rows();
        let mut widths = vec![0usize; self.columns.len()];
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let mut out = String::new();
        for (n, row) in rows.iter().enumerate() {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
                .collect();
            out.push_str(cells.join(" | ").trim_end());
            out.push('\n');
            if n == 0 {
                let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
                out.push_str(&rule.join("-+-"));
                out.push('\n');
            }
        }
        out
    }
}
