//! Result exporter: write a result set to a fresh destination tab.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::clock::Clock;
use super::error::{PipelineError, PipelineResult};
use crate::engine::ResultSet;
use crate::sheets::a1::quote_tab;
use crate::sheets::SheetDestination;

pub const DEFAULT_TAB_PREFIX: &str = "Query Result";

/// Where an export landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
    pub spreadsheet_id: String,
    pub tab_title: String,
    pub tab_id: i64,
    pub range: String,
    /// Data rows written, excluding the header.
    pub rows_written: usize,
}

/// Timestamp form used in generated titles, safe for tab names.
pub fn title_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

pub struct ResultExporter {
    tab_prefix: String,
    clock: Arc<dyn Clock>,
    last_title: Mutex<Option<(String, u32)>>,
}

impl ResultExporter {
    pub fn new(tab_prefix: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tab_prefix: tab_prefix.into(),
            clock,
            last_title: Mutex::new(None),
        }
    }

    /// Next tab title. Repeats within the same clock reading get a ` (n)` suffix.
    pub fn tab_title(&self) -> String {
        let base = format!("{} {}", self.tab_prefix, title_timestamp(self.clock.now()));
        let mut last = match self.last_title.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let repeat = match last.as_mut() {
            Some((prev, counter)) if *prev == base => {
                *counter += 1;
                Some(*counter)
            }
            _ => None,
        };
        match repeat {
            Some(n) => format!("{} ({})", base, n),
            None => {
                *last = Some((base.clone(), 1));
                base
            }
        }
    }

    /// Create a new tab in `spreadsheet_id` and write `result` into it.
    pub async fn export(
        &self,
        destination: &dyn SheetDestination,
        spreadsheet_id: &str,
        result: &ResultSet,
    ) -> PipelineResult<ExportReport> {
        if !result.has_columns() {
            return Err(PipelineError::ExportEmptyResult);
        }

        let title = self.tab_title();
        let tab = destination
            .add_tab(spreadsheet_id, &title)
            .await
            .map_err(|e| PipelineError::from_sheets(e, PipelineError::ExportTabCreateFailed))?;

        let values = result.to_display_rows();
        let range = format!("{}!A1", quote_tab(&tab.title));
        destination
            .write_range(spreadsheet_id, &range, &values)
            .await
            .map_err(|e| {
                PipelineError::from_sheets(e, |source| PipelineError::ExportWriteFailed {
                    tab: tab.title.clone(),
                    source,
                })
            })?;

        info!(
            spreadsheet = %spreadsheet_id,
            tab = %tab.title,
            rows = result.len(),
            "exported query result"
        );

        Ok(ExportReport {
            spreadsheet_id: spreadsheet_id.to_string(),
            tab_title: tab.title,
            tab_id: tab.id,
            range,
            rows_written: result.len(),
        })
    }
}
