//! SQL text generation for the staging table.
//!
//! - [`quote`] - identifier and literal quoting
//! - [`statement`] - DROP / CREATE / INSERT / COUNT builders

pub mod quote;
pub mod statement;

pub use quote::{is_quotable_identifier, literal_or_null, quote_identifier, quote_literal};
pub use statement::{count_rows, CreateTable, DropTable, Insert};
