//! Spreadsheet collaborators.
//!
//! The pipeline reads ranges from a [`SheetSource`] and writes results to a
//! [`SheetDestination`]. Both are opaque external services; this module only
//! defines the contracts and two backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Session                                 │
//! │  ┌───────────────────────────┐  ┌────────────────────────────┐  │
//! │  │  SheetSource (read)       │  │  SheetDestination (write)  │  │
//! │  │  - get_range()            │  │  - create_spreadsheet()    │  │
//! │  │  - list_spreadsheets()    │  │  - add_tab()               │  │
//! │  │  - list_tabs()            │  │  - write_range()           │  │
//! │  └───────────────────────────┘  └────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!                 │                                │
//!                 ▼                                ▼
//!   Workbook (JSON file / in memory)     GoogleSheets (Sheets v4 + Drive v3)
//! ```

pub mod a1;
mod auth;
mod error;
pub mod google;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use a1::{column_index, column_letters, quote_tab, split_notation, A1Range};
pub use auth::{AuthError, Credential, CredentialProvider, EnvToken, StaticToken};
pub use error::{SheetsError, SheetsResult};
pub use google::GoogleSheets;
pub use memory::Workbook;

use crate::value::Value;

/// Identifies a block of cells: spreadsheet, tab and A1 range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    pub spreadsheet_id: String,
    pub tab: String,
    pub range: String,
}

impl CellRange {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        tab: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            tab: tab.into(),
            range: range.into(),
        }
    }

    /// Full A1 notation, e.g. `'Sales Q1'!A1:Z1000`.
    pub fn a1_notation(&self) -> String {
        format!("{}!{}", quote_tab(&self.tab), self.range)
    }
}

/// A spreadsheet visible to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetInfo {
    pub id: String,
    pub name: String,
}

/// A tab inside a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: i64,
    pub title: String,
}

/// Read side of a spreadsheet service.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Fetch a range with unformatted values. Rows may be ragged; trailing
    /// empty cells and rows are omitted.
    async fn get_range(&self, range: &CellRange) -> SheetsResult<Vec<Vec<Value>>>;

    /// List spreadsheets, sorted by name.
    async fn list_spreadsheets(&self) -> SheetsResult<Vec<SpreadsheetInfo>>;

    /// List the tabs of one spreadsheet, sorted by title.
    async fn list_tabs(&self, spreadsheet_id: &str) -> SheetsResult<Vec<TabInfo>>;
}

/// Write side of a spreadsheet service.
#[async_trait]
pub trait SheetDestination: Send + Sync {
    /// Create a new spreadsheet.
    async fn create_spreadsheet(&self, title: &str) -> SheetsResult<SpreadsheetInfo>;

    /// Add a tab to an existing spreadsheet.
    async fn add_tab(&self, spreadsheet_id: &str, title: &str) -> SheetsResult<TabInfo>;

    /// Write a rectangular block of display strings starting at the top-left
    /// cell of `range` (full A1 notation including the tab).
    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> SheetsResult<()>;
}
