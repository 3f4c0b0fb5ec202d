//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by the embedded engine. Messages are the engine's own
/// diagnostics, passed through verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine could not be opened.
    #[error("failed to open engine: {0}")]
    Open(String),

    /// The statement could not be parsed.
    #[error("{0}")]
    Syntax(String),

    /// The statement parsed but failed while preparing or running.
    #[error("{0}")]
    Execution(String),
}

impl EngineError {
    /// The engine's diagnostic message.
    pub fn message(&self) -> &str {
        match self {
            Self::Open(m) | Self::Syntax(m) | Self::Execution(m) => m,
        }
    }

    /// Check if this error is a parse failure.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }
}

/// Message fragments SQLite uses for statements it cannot parse.
const SYNTAX_MARKERS: &[&str] = &["syntax error", "incomplete input", "unrecognized token"];

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        if SYNTAX_MARKERS.iter().any(|m| message.contains(m)) {
            Self::Syntax(message)
        } else {
            Self::Execution(message)
        }
    }
}
