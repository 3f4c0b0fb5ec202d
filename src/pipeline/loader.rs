//! Staging loader: replace the staging table in one transaction.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::error::{PipelineError, PipelineResult};
use super::schema::ColumnSchema;
use super::source::RawRow;
use crate::engine::{Engine, EngineError};
use crate::sql::{count_rows, CreateTable, DropTable, Insert};
use crate::value::Value;

/// Default number of rows per batched INSERT.
pub const DEFAULT_BATCH_ROWS: usize = 500;

/// How data rows are written into the staging table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Multi-row INSERTs with bound parameters.
    #[default]
    Batched,
    /// One literal INSERT per row. Cells containing a NUL character cannot
    /// be written as SQL literals and fail the load.
    RowWise,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub table: String,
    pub strategy: LoadStrategy,
    pub batch_rows: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            table: "sheet_data".to_string(),
            strategy: LoadStrategy::Batched,
            batch_rows: DEFAULT_BATCH_ROWS,
        }
    }
}

/// Outcome of a committed load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub table: String,
    pub columns: Vec<String>,
    pub rows_submitted: usize,
    /// Row count read back after commit, if the count query succeeded.
    pub rows_loaded: Option<usize>,
    /// Set when the read-back count disagrees with `rows_submitted`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl LoadReport {
    pub fn is_consistent(&self) -> bool {
        self.warning.is_none()
    }
}

/// Writes a schema and its rows into the staging table.
#[derive(Debug, Clone, Default)]
pub struct StagingLoader {
    options: LoadOptions,
}

impl StagingLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Drop, recreate and fill the staging table atomically.
    ///
    /// On failure the transaction is rolled back, so the previous staging
    /// table (if any) is left exactly as it was.
    pub fn load(
        &self,
        engine: &mut dyn Engine,
        schema: &ColumnSchema,
        rows: &[RawRow],
    ) -> PipelineResult<LoadReport> {
        let table = &self.options.table;
        let columns = schema.names();

        if engine.in_transaction() {
            warn!(table = %table, "rolling back a transaction left open before loading");
            engine.rollback().map_err(PipelineError::Staging)?;
        }
        engine.begin().map_err(PipelineError::Staging)?;

        if let Err(err) = self.replace_table(engine, schema, rows) {
            if let Err(rollback_err) = engine.rollback() {
                error!(table = %table, error = %rollback_err, "rollback failed");
            }
            return Err(err);
        }

        if let Err(err) = engine.commit() {
            if let Err(rollback_err) = engine.rollback() {
                error!(table = %table, error = %rollback_err, "rollback failed");
            }
            return Err(PipelineError::Staging(err));
        }

        let rows_submitted = rows.len();
        let rows_loaded = match count_table(engine, table) {
            Ok(n) => Some(n),
            Err(err) => {
                warn!(table = %table, error = %err, "could not re-count staged rows");
                None
            }
        };
        let warning = match rows_loaded {
            Some(n) if n == rows_submitted => None,
            Some(n) => Some(format!(
                "staged {} rows but {} were submitted",
                n, rows_submitted
            )),
            None => Some("could not verify the staged row count".to_string()),
        };
        if let Some(w) = &warning {
            warn!(table = %table, "{}", w);
        }

        info!(
            table = %table,
            columns = columns.len(),
            rows = rows_submitted,
            strategy = ?self.options.strategy,
            "staging table loaded"
        );

        Ok(LoadReport {
            table: table.clone(),
            columns,
            rows_submitted,
            rows_loaded,
            warning,
        })
    }

    fn replace_table(
        &self,
        engine: &mut dyn Engine,
        schema: &ColumnSchema,
        rows: &[RawRow],
    ) -> PipelineResult<()> {
        let table = &self.options.table;

        let drop = DropTable::new(table.as_str()).if_exists().to_sql();
        debug!(sql = %drop, "drop staging table");
        engine.execute(&drop).map_err(PipelineError::Staging)?;

        let create = schema
            .columns()
            .iter()
            .fold(CreateTable::new(table.as_str()), |stmt, col| {
                stmt.column(col.name.as_str(), col.column_type.sql_type())
            })
            .to_sql();
        debug!(sql = %create, "create staging table");
        engine
            .execute(&create)
            .map_err(|e| PipelineError::SchemaConflict(e.message().to_string()))?;

        let columns = schema.names();
        let width = columns.len();
        let cells: Vec<Vec<Option<String>>> = rows.iter().map(|r| to_sql_row(r, width)).collect();

        match self.options.strategy {
            LoadStrategy::Batched => {
                let batch = self.options.batch_rows.max(1);
                for (i, chunk) in cells.chunks(batch).enumerate() {
                    engine
                        .insert_rows(table, &columns, chunk)
                        .map_err(|source| PipelineError::InsertFailed {
                            row: i * batch,
                            source,
                        })?;
                }
            }
            LoadStrategy::RowWise => {
                let insert = Insert::into(table.as_str(), &columns);
                for (i, row) in cells.iter().enumerate() {
                    if row.iter().flatten().any(|cell| cell.contains('\0')) {
                        return Err(PipelineError::InsertFailed {
                            row: i,
                            source: EngineError::Execution(
                                "cell contains a NUL character; use the batched load strategy"
                                    .to_string(),
                            ),
                        });
                    }
                    engine
                        .execute(&insert.literal_row(row))
                        .map_err(|source| PipelineError::InsertFailed { row: i, source })?;
                }
            }
        }

        Ok(())
    }
}

/// Render a row as nullable text, padded or truncated to `width`.
fn to_sql_row(row: &[Value], width: usize) -> Vec<Option<String>> {
    (0..width)
        .map(|i| row.get(i).and_then(Value::to_sql_text))
        .collect()
}

fn count_table(engine: &mut dyn Engine, table: &str) -> Result<usize, EngineError> {
    let rs = engine.execute(&count_rows(table))?;
    match rs.rows.first().and_then(|r| r.first()) {
        Some(Value::Integer(n)) => Ok((*n).max(0) as usize),
        other => Err(EngineError::Execution(format!(
            "unexpected row count result: {:?}",
            other
        ))),
    }
}
