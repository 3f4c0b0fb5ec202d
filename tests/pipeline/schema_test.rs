//! Header row to column schema.

use chrono::{DateTime, Utc};
use sheetsql::pipeline::{infer_schema, synthesized_name, DuplicateHeaders, PipelineError};
use sheetsql::value::Value;

fn at(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap()
}

#[test]
fn test_blank_headers_are_synthesized() {
    let header = vec!["Name".into(), Value::Null, "  ".into(), "Total".into()];
    let schema = infer_schema(&header, at(1_700_000_000_000), DuplicateHeaders::Suffix).unwrap();
    assert_eq!(
        schema.names(),
        vec![
            "Name",
            "col_1_1700000000000",
            "col_2_1700000000000",
            "Total"
        ]
    );
}

#[test]
fn test_synthesized_names_differ_between_loads() {
    let header = vec![Value::Null, "x".into()];
    let first = infer_schema(&header, at(1_000), DuplicateHeaders::Suffix).unwrap();
    let second = infer_schema(&header, at(2_000), DuplicateHeaders::Suffix).unwrap();
    assert_ne!(first.names()[0], second.names()[0]);

    let again = infer_schema(&header, at(1_000), DuplicateHeaders::Suffix).unwrap();
    assert_eq!(first, again);
    assert_eq!(first.names()[0], synthesized_name(0, at(1_000)));
}

#[test]
fn test_numeric_headers_render_as_text() {
    let header = vec![Value::Integer(2023), Value::Real(2024.0), Value::Bool(true)];
    let schema = infer_schema(&header, at(0), DuplicateHeaders::Suffix).unwrap();
    assert_eq!(schema.names(), vec!["2023", "2024", "true"]);
}

#[test]
fn test_duplicates_suffixed() {
    let header = vec!["id".into(), "ID".into(), "id".into(), "name".into()];
    let schema = infer_schema(&header, at(0), DuplicateHeaders::Suffix).unwrap();
    assert_eq!(schema.names(), vec!["id", "ID_2", "id_3", "name"]);
    assert_eq!(schema.len(), 4);
}

#[test]
fn test_duplicates_rejected() {
    let header = vec!["id".into(), "Id".into()];
    let err = infer_schema(&header, at(0), DuplicateHeaders::Reject).unwrap_err();
    assert!(matches!(err, PipelineError::SchemaConflict(ref m) if m.contains("column 2")));
    assert_eq!(err.code(), "SCHEMA_CONFLICT");
}

#[test]
fn test_nul_in_header_is_a_conflict() {
    let header = vec!["ok".into(), "bad\0name".into()];
    let err = infer_schema(&header, at(0), DuplicateHeaders::Suffix).unwrap_err();
    assert!(matches!(err, PipelineError::SchemaConflict(_)));
}
