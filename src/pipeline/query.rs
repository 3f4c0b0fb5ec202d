//! Query executor.

use tracing::{debug, info};

use super::error::{PipelineError, PipelineResult};
use crate::engine::{Engine, ResultSet};

/// Strip trailing whitespace and statement terminators.
pub fn normalize_query(sql: &str) -> &str {
    sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

/// Run `sql` against the engine and return its result.
///
/// The query is not validated or sandboxed; it may read or modify any table
/// the connection can see.
pub fn run_query(engine: &mut dyn Engine, sql: &str) -> PipelineResult<ResultSet> {
    let sql = normalize_query(sql);
    if sql.is_empty() {
        return Err(PipelineError::QuerySyntaxError("empty query".to_string()));
    }

    debug!(sql = %sql, "running query");
    let result = engine.execute(sql).map_err(PipelineError::from_query)?;
    info!(columns = result.columns.len(), rows = result.len(), "query finished");
    Ok(result)
}
