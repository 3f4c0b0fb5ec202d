//! SQLite-backed embedded engine.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};

use super::error::{EngineError, EngineResult};
use super::result::ResultSet;
use super::Engine;
use crate::sql::Insert;
use crate::value::Value;

/// Upper bound on bound parameters in one statement.
const MAX_BIND_PARAMS: usize = 32_766;

/// Path that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// An embedded SQLite database over a single connection.
pub struct SqliteEngine {
    conn: Connection,
}

impl SqliteEngine {
    /// Open an in-memory database.
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| EngineError::Open(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Open a database file, or an in-memory one for `:memory:`.
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        if path.as_os_str() == IN_MEMORY {
            return Self::open_in_memory();
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::Open(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|e| EngineError::Open(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Whether a table with this name exists.
    pub fn table_exists(&self, table: &str) -> EngineResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

fn to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

impl Engine for SqliteEngine {
    fn execute(&mut self, sql: &str) -> EngineResult<ResultSet> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(to_value(row.get_ref(i)?));
            }
            out.push(values);
        }

        Ok(ResultSet::new(columns, out))
    }

    fn begin(&mut self) -> EngineResult<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> EngineResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> EngineResult<()> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Option<String>>],
    ) -> EngineResult<usize> {
        if columns.is_empty() {
            return Err(EngineError::Execution(
                "cannot insert into a table without columns".to_string(),
            ));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(EngineError::Execution(format!(
                "row has {} values but table has {} columns",
                bad.len(),
                columns.len()
            )));
        }

        let insert = Insert::into(table, columns);
        let rows_per_statement = (MAX_BIND_PARAMS / columns.len()).max(1);
        let mut inserted = 0;

        for chunk in rows.chunks(rows_per_statement) {
            let sql = insert.placeholders(chunk.len());
            let mut stmt = self.conn.prepare_cached(&sql)?;
            inserted += stmt.execute(params_from_iter(chunk.iter().flatten()))?;
        }

        Ok(inserted)
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}
