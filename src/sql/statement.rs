//! Statement builders for the staging table lifecycle.
//!
//! Every builder renders plain SQLite-compatible SQL with all identifiers
//! quoted, so header text taken verbatim from a sheet can be used as a column
//! name and referenced again in user queries.

use super::quote::{literal_or_null, quote_identifier};

/// A DROP TABLE statement.
#[derive(Debug, Clone)]
pub struct DropTable {
    pub name: String,
    pub if_exists: bool,
}

impl DropTable {
    /// Create a new DROP TABLE statement.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            if_exists: false,
        }
    }

    /// Add IF EXISTS clause.
    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    pub fn to_sql(&self) -> String {
        if self.if_exists {
            format!("DROP TABLE IF EXISTS {}", quote_identifier(&self.name))
        } else {
            format!("DROP TABLE {}", quote_identifier(&self.name))
        }
    }
}

/// A CREATE TABLE statement with typed columns.
#[derive(Debug, Clone)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<(String, String)>,
}

impl CreateTable {
    /// Create a new CREATE TABLE statement.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column with the given SQL type.
    pub fn column(mut self, name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        self.columns.push((name.into(), sql_type.into()));
        self
    }

    pub fn to_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|(name, ty)| format!("{} {}", quote_identifier(name), ty))
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            quote_identifier(&self.name),
            columns.join(", ")
        )
    }
}

/// An INSERT statement, rendered either with literal values or with
/// positional placeholders for bound parameters.
#[derive(Debug, Clone)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
}

impl Insert {
    /// Create a new INSERT statement.
    pub fn into(table: impl Into<String>, columns: &[String]) -> Self {
        Self {
            table: table.into(),
            columns: columns.to_vec(),
        }
    }

    fn prefix(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| quote_identifier(c)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ",
            quote_identifier(&self.table),
            columns.join(", ")
        )
    }

    /// Render a single row as literals. Missing trailing cells become NULL.
    pub fn literal_row(&self, row: &[Option<String>]) -> String {
        let values: Vec<String> = (0..self.columns.len())
            .map(|i| literal_or_null(row.get(i).and_then(|v| v.as_deref())))
            .collect();
        format!("{}({})", self.prefix(), values.join(", "))
    }

    /// Render `rows` placeholder tuples, one `?` per column.
    pub fn placeholders(&self, rows: usize) -> String {
        let tuple = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let tuples = vec![tuple; rows];
        format!("{}{}", self.prefix(), tuples.join(", "))
    }
}

/// `SELECT COUNT(*)` over a table.
pub fn count_rows(table: &str) -> String {
    format!("SELECT COUNT(*) AS row_count FROM {}", quote_identifier(table))
}
