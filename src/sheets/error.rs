//! Spreadsheet collaborator error types.

use thiserror::Error;

use super::auth::AuthError;

/// Result type for spreadsheet operations.
pub type SheetsResult<T> = Result<T, SheetsError>;

/// Errors raised by spreadsheet sources and destinations.
#[derive(Error, Debug)]
pub enum SheetsError {
    /// No spreadsheet with this id is visible to the caller.
    #[error("spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    /// The spreadsheet exists but has no tab with this title.
    #[error("tab '{tab}' not found in spreadsheet {spreadsheet_id}")]
    TabNotFound { spreadsheet_id: String, tab: String },

    /// A tab with this title already exists.
    #[error("tab '{tab}' already exists in spreadsheet {spreadsheet_id}")]
    TabExists { spreadsheet_id: String, tab: String },

    /// The A1 range could not be parsed.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Transport failure talking to the remote API.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered with an error status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The remote API answered with a body we could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("workbook I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("workbook JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SheetsError {
    /// Create an API error from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Check if this error came from missing or rejected credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Api { status: 401, .. })
    }

    /// Extract the credential failure, or give the error back unchanged.
    pub fn into_auth(self) -> Result<AuthError, Self> {
        if !self.is_auth() {
            return Err(self);
        }
        match self {
            Self::Auth(auth) => Ok(auth),
            Self::Api { message, .. } => Ok(AuthError::Rejected(message)),
            other => Err(other),
        }
    }
}
