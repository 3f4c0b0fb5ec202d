//! Tabular source adapter: fetch a range and square it up.

use tracing::debug;

use super::error::{PipelineError, PipelineResult};
use crate::sheets::{CellRange, SheetSource};
use crate::value::Value;

/// An ordered row of scalar cells.
pub type RawRow = Vec<Value>;

/// A fetched range split into header and data rows, every row the same width.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub header: RawRow,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Build from fetched rows, padding ragged rows with nulls to the widest row.
    ///
    /// Returns `None` when there are no rows at all.
    pub fn from_rows(mut rows: Vec<RawRow>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, Value::Null);
        }
        let header = rows.remove(0);
        Some(Self { header, rows })
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Rows fetched including the header.
    pub fn fetched_rows(&self) -> usize {
        self.rows.len() + 1
    }
}

/// Fetch `range` from `source` as a rectangular table.
///
/// Fails with `SourceUnavailable` when the backend call fails and with
/// `EmptyRange` when it returns no rows.
pub async fn fetch_table(source: &dyn SheetSource, range: &CellRange) -> PipelineResult<RawTable> {
    let notation = range.a1_notation();
    let rows = source
        .get_range(range)
        .await
        .map_err(PipelineError::from_source)?;
    debug!(range = %notation, rows = rows.len(), "fetched range");

    RawTable::from_rows(rows).ok_or(PipelineError::EmptyRange(notation))
}
