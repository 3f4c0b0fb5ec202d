//! Identifier and literal quoting for the staging engine.

/// Quote identifier with double quotes (ANSI style), doubling embedded quotes.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Whether an identifier can be quoted at all.
///
/// The engine reads statements as C strings, so an embedded NUL would truncate
/// the statement no matter how it is escaped.
pub fn is_quotable_identifier(ident: &str) -> bool {
    !ident.contains('\0')
}

/// Quote string with single quotes (standard SQL), doubling embedded quotes.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Render an optional text value as a literal, `None` becoming `NULL`.
pub fn literal_or_null(value: Option<&str>) -> String {
    match value {
        Some(s) => quote_literal(s),
        None => "NULL".to_string(),
    }
}
