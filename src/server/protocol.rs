//! Protocol types for the `serve` loop.
//!
//! One JSON object per line in each direction. Every request carries an id
//! that is echoed back in its response.

use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineError;
use crate::sheets::{SpreadsheetInfo, TabInfo};

// ============================================================================
// Request/Response Envelope
// ============================================================================

/// Request envelope read from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Request ID for correlation.
    pub id: String,
    /// Method name (e.g., "staging.load").
    pub method: String,
    /// Method-specific parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response envelope written back to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Request ID this response corresponds to; empty when the request
    /// could not be parsed.
    pub id: String,
    /// Whether the request succeeded.
    pub success: bool,
    /// Result data (present if success = true).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error information (present if success = false).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl ResponseEnvelope {
    pub fn ok(id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, error: ErrorInfo) -> Self {
        Self {
            id: id.into(),
            success: false,
            result: None,
            error: Some(error),
        }
    }
}

/// Error information in a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Full upstream diagnostic, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            detail: None,
        }
    }
}

impl From<&PipelineError> for ErrorInfo {
    fn from(err: &PipelineError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.user_message(),
            detail: Some(err.detail()),
        }
    }
}

/// Error codes produced by the protocol layer itself.
pub mod codes {
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
    pub const METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

// ============================================================================
// Method names
// ============================================================================

pub mod methods {
    pub const LIST_SPREADSHEETS: &str = "source.list_spreadsheets";
    pub const LIST_TABS: &str = "source.list_tabs";
    pub const SELECT_SOURCE: &str = "source.select";
    pub const LOAD: &str = "staging.load";
    pub const QUERY: &str = "query.run";
    pub const EXPORT: &str = "export.run";
    pub const CREATE_DESTINATION: &str = "destination.create";
    pub const SELECT_DESTINATION: &str = "destination.select";
}

// ============================================================================
// Request Parameters
// ============================================================================

/// Parameters for `source.list_tabs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTabsParams {
    pub spreadsheet_id: String,
}

/// Parameters for `source.select`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectSourceParams {
    pub spreadsheet_id: String,
    pub tab: String,
    /// A1 range; the configured default when absent.
    #[serde(default)]
    pub range: Option<String>,
}

/// Parameters for `staging.load`.
///
/// With no fields the selected source is loaded; with a spreadsheet and tab
/// that range is selected first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadParams {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default)]
    pub range: Option<String>,
}

/// Parameters for `query.run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryParams {
    pub sql: String,
}

/// Parameters for `export.run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportParams {
    pub sql: String,
    /// Destination spreadsheet; the selected one when absent.
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
}

/// Parameters for `destination.create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDestinationParams {
    #[serde(default)]
    pub title: Option<String>,
}

/// Parameters for `destination.select`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectDestinationParams {
    pub spreadsheet_id: String,
}

// ============================================================================
// Results
// ============================================================================

/// Result of `source.list_spreadsheets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSpreadsheetsResult {
    pub spreadsheets: Vec<SpreadsheetInfo>,
}

/// Result of `source.list_tabs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTabsResult {
    pub tabs: Vec<TabInfo>,
}

/// Result of `destination.select`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectDestinationResult {
    pub spreadsheet_id: String,
}
