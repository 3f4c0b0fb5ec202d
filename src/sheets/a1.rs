//! A1 notation.
//!
//! Supports the range shapes the Sheets API accepts for reads and writes:
//! `A1`, `A1:C10`, `A:C` (whole columns), `B2:D` (open-ended rows) and
//! `2:5` (whole rows), optionally prefixed by a tab (`'My Tab'!A1:C10`).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::error::{SheetsError, SheetsResult};
use crate::value::Value;

static ENDPOINT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]{0,3})([0-9]*)$").unwrap());

/// Zero-based column index for column letters (`A` = 0, `AA` = 26).
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(index - 1)
}

/// Column letters for a zero-based column index.
pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push((b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Quote a tab title for use in A1 notation.
pub fn quote_tab(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Split `'Tab'!A1:B2` into its tab title and range parts.
pub fn split_notation(notation: &str) -> SheetsResult<(Option<String>, String)> {
    let notation = notation.trim();
    if let Some(rest) = notation.strip_prefix('\'') {
        let mut title = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            if ch == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    chars.next();
                    title.push('\'');
                    continue;
                }
                let remainder = &rest[i + 1..];
                let range = remainder
                    .strip_prefix('!')
                    .ok_or_else(|| SheetsError::InvalidRange(notation.to_string()))?;
                return Ok((Some(title), range.to_string()));
            }
            title.push(ch);
        }
        return Err(SheetsError::InvalidRange(notation.to_string()));
    }

    match notation.split_once('!') {
        Some((tab, range)) => Ok((Some(tab.to_string()), range.to_string())),
        None => Ok((None, notation.to_string())),
    }
}

/// A parsed rectangular range. Bounds are zero-based and inclusive;
/// `None` for a last bound means the range is open in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct A1Range {
    pub first_col: usize,
    pub first_row: usize,
    pub last_col: Option<usize>,
    pub last_row: Option<usize>,
}

struct Endpoint {
    col: Option<usize>,
    row: Option<usize>,
}

fn parse_endpoint(text: &str, whole: &str) -> SheetsResult<Endpoint> {
    let invalid = || SheetsError::InvalidRange(whole.to_string());
    let caps = ENDPOINT_PATTERN.captures(text.trim()).ok_or_else(invalid)?;
    let letters = &caps[1];
    let digits = &caps[2];
    if letters.is_empty() && digits.is_empty() {
        return Err(invalid());
    }

    let col = if letters.is_empty() {
        None
    } else {
        Some(column_index(letters).ok_or_else(invalid)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        let n: usize = digits.parse().map_err(|_| invalid())?;
        if n == 0 {
            return Err(invalid());
        }
        Some(n - 1)
    };
    Ok(Endpoint { col, row })
}

impl A1Range {
    /// Parse the range part of an A1 notation (no tab prefix).
    pub fn parse(range: &str) -> SheetsResult<Self> {
        let (start, end) = match range.split_once(':') {
            Some((start, end)) => (parse_endpoint(start, range)?, Some(parse_endpoint(end, range)?)),
            None => (parse_endpoint(range, range)?, None),
        };

        let Some(end) = end else {
            // A single endpoint: one cell, one whole column or one whole row.
            return Ok(Self {
                first_col: start.col.unwrap_or(0),
                first_row: start.row.unwrap_or(0),
                last_col: start.col,
                last_row: start.row,
            });
        };

        let mut parsed = Self {
            first_col: start.col.unwrap_or(0),
            first_row: start.row.unwrap_or(0),
            last_col: end.col,
            last_row: end.row,
        };
        if let Some(last) = parsed.last_col {
            if last < parsed.first_col {
                parsed.last_col = Some(parsed.first_col);
                parsed.first_col = last;
            }
        }
        if let Some(last) = parsed.last_row {
            if last < parsed.first_row {
                parsed.last_row = Some(parsed.first_row);
                parsed.first_row = last;
            }
        }
        Ok(parsed)
    }

    /// Cut this range out of a row-major grid, trimming trailing empty cells
    /// and trailing empty rows the way the Sheets API does.
    pub fn slice(&self, grid: &[Vec<Value>]) -> Vec<Vec<Value>> {
        if self.first_row >= grid.len() {
            return Vec::new();
        }
        let last_row = self
            .last_row
            .map_or(grid.len() - 1, |r| r.min(grid.len() - 1));

        let mut rows: Vec<Vec<Value>> = grid[self.first_row..=last_row]
            .iter()
            .map(|row| {
                let mut cells: Vec<Value> = if self.first_col >= row.len() {
                    Vec::new()
                } else {
                    let last_col = self.last_col.map_or(row.len() - 1, |c| c.min(row.len() - 1));
                    row[self.first_col..=last_col].to_vec()
                };
                while cells.last().is_some_and(is_empty_cell) {
                    cells.pop();
                }
                cells
            })
            .collect();

        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        rows
    }
}

fn is_empty_cell(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Text(s) => s.is_empty(),
        _ => false,
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:", column_letters(self.first_col), self.first_row + 1)?;
        if let Some(col) = self.last_col {
            write!(f, "{}", column_letters(col))?;
        }
        if let Some(row) = self.last_row {
            write!(f, "{}", row + 1)?;
        }
        Ok(())
    }
}
