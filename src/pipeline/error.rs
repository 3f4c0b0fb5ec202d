//! Pipeline stage errors.
//!
//! Every stage maps collaborator failures into [`PipelineError`] at its
//! boundary. Each variant carries the upstream diagnostic for logging and
//! offers a short [`user_message`](PipelineError::user_message) for display.

use thiserror::Error;

use crate::engine::EngineError;
use crate::sheets::{AuthError, SheetsError};

/// Result type for pipeline stages.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source spreadsheet could not be read.
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[source] SheetsError),

    /// The requested range holds no rows.
    #[error("range {0} returned no rows")]
    EmptyRange(String),

    /// The header row cannot become a table schema.
    #[error("schema conflict: {0}")]
    SchemaConflict(String),

    /// A data row could not be inserted; the whole load was rolled back.
    #[error("insert failed at data row {row}: {source}")]
    InsertFailed {
        /// Zero-based index of the first data row in the failing statement.
        row: usize,
        #[source]
        source: EngineError,
    },

    /// Transaction control or table replacement failed; the load was rolled back.
    #[error("staging failed: {0}")]
    Staging(#[source] EngineError),

    /// The query could not be parsed.
    #[error("syntax error: {0}")]
    QuerySyntaxError(String),

    /// The query failed while preparing or running.
    #[error("query failed: {0}")]
    QueryExecutionError(String),

    /// The result has no columns, so there is nothing to export.
    #[error("query returned no columns; nothing to export")]
    ExportEmptyResult,

    /// The destination tab could not be created; nothing was written.
    #[error("failed to create export tab: {0}")]
    ExportTabCreateFailed(#[source] SheetsError),

    /// The destination tab was created but the write failed.
    #[error("failed to write export tab '{tab}': {source}")]
    ExportWriteFailed {
        tab: String,
        #[source]
        source: SheetsError,
    },

    /// A destination spreadsheet could not be created.
    #[error("failed to create destination spreadsheet: {0}")]
    DestinationCreateFailed(#[source] SheetsError),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("no source range selected")]
    NoSourceSelected,

    #[error("no destination spreadsheet selected")]
    NoDestinationSelected,
}

impl PipelineError {
    /// Map a spreadsheet failure with `otherwise`, keeping credential
    /// problems distinct at every stage.
    pub fn from_sheets(err: SheetsError, otherwise: impl FnOnce(SheetsError) -> Self) -> Self {
        match err.into_auth() {
            Ok(auth) => Self::Auth(auth),
            Err(other) => otherwise(other),
        }
    }

    /// Map a source-side failure.
    pub fn from_source(err: SheetsError) -> Self {
        Self::from_sheets(err, Self::SourceUnavailable)
    }

    /// Map a query failure, keeping parse errors distinct.
    pub fn from_query(err: EngineError) -> Self {
        if err.is_syntax() {
            Self::QuerySyntaxError(err.message().to_string())
        } else {
            Self::QueryExecutionError(err.message().to_string())
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            Self::EmptyRange(_) => "EMPTY_RANGE",
            Self::SchemaConflict(_) => "SCHEMA_CONFLICT",
            Self::InsertFailed { .. } => "INSERT_FAILED",
            Self::Staging(_) => "STAGING_FAILED",
            Self::QuerySyntaxError(_) => "QUERY_SYNTAX_ERROR",
            Self::QueryExecutionError(_) => "QUERY_EXECUTION_ERROR",
            Self::ExportEmptyResult => "EXPORT_EMPTY_RESULT",
            Self::ExportTabCreateFailed(_) => "EXPORT_TAB_CREATE_FAILED",
            Self::ExportWriteFailed { .. } => "EXPORT_WRITE_FAILED",
            Self::DestinationCreateFailed(_) => "DESTINATION_CREATE_FAILED",
            Self::Auth(_) => "AUTH_ERROR",
            Self::NoSourceSelected => "NO_SOURCE_SELECTED",
            Self::NoDestinationSelected => "NO_DESTINATION_SELECTED",
        }
    }

    /// Short message for the user-facing surface.
    pub fn user_message(&self) -> String {
        match self {
            Self::SourceUnavailable(_) => {
                "Failed to get data from the sheet. Check the range and permissions.".to_string()
            }
            Self::EmptyRange(range) => format!("No data found in {}.", range),
            Self::SchemaConflict(detail) => format!("The header row cannot be used: {}", detail),
            Self::InsertFailed { row, .. } => {
                format!("Loading stopped at data row {}; nothing was changed.", row + 1)
            }
            Self::Staging(_) => "Loading failed; the previous data is unchanged.".to_string(),
            Self::QuerySyntaxError(msg) => format!("SQL syntax error: {}", msg),
            Self::QueryExecutionError(msg) => format!("SQL error: {}", msg),
            Self::ExportEmptyResult => "Query returned no columns. Nothing to save.".to_string(),
            Self::ExportTabCreateFailed(_) => {
                "Could not create a results tab in the destination.".to_string()
            }
            Self::ExportWriteFailed { tab, .. } => {
                format!("Created tab '{}' but could not write the results.", tab)
            }
            Self::DestinationCreateFailed(_) => "Could not create a new spreadsheet.".to_string(),
            Self::Auth(_) => "Sign-in required.".to_string(),
            Self::NoSourceSelected => "Select a source sheet and tab first.".to_string(),
            Self::NoDestinationSelected => "Select a destination sheet first.".to_string(),
        }
    }

    /// Full diagnostic including every nested source error.
    pub fn detail(&self) -> String {
        let mut out = self.to_string();
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            let text = err.to_string();
            if !out.contains(&text) {
                out.push_str(": ");
                out.push_str(&text);
            }
            current = err.source();
        }
        out
    }
}
