//! Schema inference from a header row.
//!
//! - Non-blank header cells become column names verbatim.
//! - Blank cells become `col_<index>_<millis>`, unique per load timestamp.
//! - Duplicates (compared ASCII case-insensitively, as the engine resolves
//!   identifiers) are either suffixed `_2`, `_3`, ... or rejected.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{PipelineError, PipelineResult};
use crate::sql::is_quotable_identifier;
use crate::value::Value;

/// Policy for repeated header names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateHeaders {
    /// Rename later duplicates to `<name>_<n>`.
    #[default]
    Suffix,
    /// Fail the load with `SchemaConflict`.
    Reject,
}

/// Storage type of a staged column. Everything is staged as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Ordered, uniquely named columns of a staging table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    columns: Vec<Column>,
}

impl ColumnSchema {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Name given to a blank header cell at `index`.
pub fn synthesized_name(index: usize, loaded_at: DateTime<Utc>) -> String {
    format!("col_{}_{}", index, loaded_at.timestamp_millis())
}

/// Derive a column schema from the header row.
pub fn infer_schema(
    header: &[Value],
    loaded_at: DateTime<Utc>,
    duplicates: DuplicateHeaders,
) -> PipelineResult<ColumnSchema> {
    if header.is_empty() {
        return Err(PipelineError::SchemaConflict(
            "header row has no columns".to_string(),
        ));
    }

    let raw: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            if cell.is_blank() {
                synthesized_name(i, loaded_at)
            } else {
                cell.to_display_string()
            }
        })
        .collect();

    if let Some(bad) = raw.iter().find(|n| !is_quotable_identifier(n)) {
        return Err(PipelineError::SchemaConflict(format!(
            "header {:?} contains a NUL character",
            bad
        )));
    }

    let originals: HashSet<String> = raw.iter().map(|n| n.to_ascii_lowercase()).collect();
    let mut taken: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut columns = Vec::with_capacity(raw.len());

    for (i, name) in raw.into_iter().enumerate() {
        let key = name.to_ascii_lowercase();
        let name = if taken.contains(&key) {
            if duplicates == DuplicateHeaders::Reject {
                return Err(PipelineError::SchemaConflict(format!(
                    "duplicate header {:?} at column {}",
                    name,
                    i + 1
                )));
            }
            let renamed = (2..)
                .map(|n| format!("{}_{}", name, n))
                .find(|candidate| {
                    let k = candidate.to_ascii_lowercase();
                    !taken.contains(&k) && !originals.contains(&k)
                })
                .unwrap_or_else(|| synthesized_name(i, loaded_at));
            warn!(header = %name, renamed = %renamed, column = i + 1, "duplicate header renamed");
            renamed
        } else {
            name
        };
        taken.insert(name.to_ascii_lowercase());
        columns.push(Column {
            name,
            column_type: ColumnType::Text,
        });
    }

    Ok(ColumnSchema { columns })
}
