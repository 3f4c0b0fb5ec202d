//! # sheetsql
//!
//! Stage a spreadsheet range into an embedded SQL engine, query it with
//! arbitrary SQL, and write results back to a new spreadsheet tab.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          SheetSource (Workbook file / Google Sheets)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [source: fetch_table]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 RawTable (header + rows)                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema: infer_schema]
//! ┌─────────────────────────────────────────────────────────┐
//! │        ColumnSchema (unique TEXT column names)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [loader: one transaction]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Staging table in the embedded engine           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [query: run_query]
//! ┌─────────────────────────────────────────────────────────┐
//! │                       ResultSet                         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [export: new tab per export]
//! ┌─────────────────────────────────────────────────────────┐
//! │                   SheetDestination                      │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod sheets;
pub mod sql;
pub mod value;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::engine::{Engine, EngineError, ResultSet, SqliteEngine};
    pub use crate::pipeline::{
        Clock, ColumnSchema, DuplicateHeaders, ExportReport, FixedClock, LoadOptions, LoadReport,
        LoadStrategy, PipelineError, PipelineResult, Session, SessionSettings, SystemClock,
    };
    pub use crate::sheets::{
        CellRange, GoogleSheets, SheetDestination, SheetSource, SheetsError, SpreadsheetInfo,
        TabInfo, Workbook,
    };
    pub use crate::value::Value;
}
