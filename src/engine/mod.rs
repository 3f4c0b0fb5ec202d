//! Embedded analytical engine.
//!
//! The pipeline talks to the engine through the [`Engine`] trait: arbitrary
//! statement execution, explicit transaction control and a bulk row insert.
//! [`SqliteEngine`] is the in-process implementation; the engine has no
//! server component and is reachable only through the handle that opened it.

mod error;
mod result;
mod sqlite;

pub use error::{EngineError, EngineResult};
pub use result::{Record, ResultSet};
pub use sqlite::{SqliteEngine, IN_MEMORY};

/// A single connection to an embedded SQL engine.
///
/// All methods take `&mut self`: one connection serves one statement at a
/// time, and callers share it behind a mutex.
pub trait Engine: Send {
    /// Execute one statement and collect its result. Statements without a
    /// result shape (DDL, DML) return an empty [`ResultSet`].
    fn execute(&mut self, sql: &str) -> EngineResult<ResultSet>;

    /// Start a transaction.
    fn begin(&mut self) -> EngineResult<()>;

    /// Commit the open transaction.
    fn commit(&mut self) -> EngineResult<()>;

    /// Roll back the open transaction. A no-op when none is open.
    fn rollback(&mut self) -> EngineResult<()>;

    /// Bulk insert rows of text values (`None` = NULL) into `table`.
    ///
    /// Every row must have exactly `columns.len()` values. Returns the number
    /// of rows inserted.
    fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Option<String>>],
    ) -> EngineResult<usize>;

    /// Whether a transaction is currently open.
    fn in_transaction(&self) -> bool;
}
