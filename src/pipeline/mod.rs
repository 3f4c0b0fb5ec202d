//! Sheet to SQL to sheet pipeline.
//!
//! Stages, in order of a typical session:
//!
//! 1. [`source`] - fetch a cell range as raw rows
//! 2. [`schema`] - derive unique column names from the header row
//! 3. [`loader`] - replace the staging table atomically
//! 4. [`query`] - run arbitrary SQL over the staged data
//! 5. [`export`] - write a result set to a new destination tab
//!
//! [`Session`] ties the stages to one engine connection and the selected
//! source and destination.

pub mod clock;
pub mod error;
pub mod export;
pub mod loader;
pub mod query;
pub mod schema;
pub mod session;
pub mod source;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{PipelineError, PipelineResult};
pub use export::{ExportReport, ResultExporter};
pub use loader::{LoadOptions, LoadReport, LoadStrategy, StagingLoader};
pub use query::run_query;
pub use schema::{infer_schema, synthesized_name, Column, ColumnSchema, DuplicateHeaders};
pub use session::{QueryExport, Session, SessionSettings};
pub use source::{fetch_table, RawRow, RawTable};
