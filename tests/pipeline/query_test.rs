//! Query executor over a staged table.

use chrono::DateTime;
use sheetsql::engine::{Engine, SqliteEngine};
use sheetsql::pipeline::{infer_schema, run_query, DuplicateHeaders, PipelineError, StagingLoader};
use sheetsql::value::Value;

fn staged_engine() -> SqliteEngine {
    let mut engine = SqliteEngine::open_in_memory().unwrap();
    let header = vec![Value::from("Region"), Value::from("Amount")];
    let schema = infer_schema(
        &header,
        DateTime::from_timestamp_millis(0).unwrap(),
        DuplicateHeaders::Suffix,
    )
    .unwrap();
    let rows = vec![
        vec![Value::from("North"), Value::Integer(120)],
        vec![Value::from("South"), Value::Real(80.5)],
        vec![Value::from("North"), Value::Integer(30)],
    ];
    StagingLoader::default()
        .load(&mut engine, &schema, &rows)
        .unwrap();
    engine
}

#[test]
fn test_aggregate_over_staged_text() {
    let mut engine = staged_engine();
    let rs = run_query(
        &mut engine,
        "SELECT Region, SUM(CAST(Amount AS REAL)) AS total FROM sheet_data GROUP BY Region ORDER BY Region;",
    )
    .unwrap();
    assert_eq!(rs.columns, vec!["Region", "total"]);
    assert_eq!(
        rs.rows,
        vec![
            vec![Value::from("North"), Value::Real(150.0)],
            vec![Value::from("South"), Value::Real(80.5)],
        ]
    );
}

#[test]
fn test_syntax_error() {
    let mut engine = staged_engine();
    let err = run_query(&mut engine, "SELEC * FROM sheet_data").unwrap_err();
    assert!(matches!(err, PipelineError::QuerySyntaxError(ref m) if m.contains("syntax error")));
}

#[test]
fn test_empty_query_is_a_syntax_error() {
    let mut engine = staged_engine();
    let err = run_query(&mut engine, "  ;  ").unwrap_err();
    assert_eq!(err.code(), "QUERY_SYNTAX_ERROR");
}

#[test]
fn test_missing_table_leaves_staging_untouched() {
    let mut engine = staged_engine();
    let err = run_query(&mut engine, "SELECT * FROM no_such_table").unwrap_err();
    assert!(matches!(err, PipelineError::QueryExecutionError(ref m) if m.contains("no such table")));

    let rs = engine.execute("SELECT COUNT(*) FROM sheet_data").unwrap();
    assert_eq!(rs.rows[0][0], Value::Integer(3));
}

#[test]
fn test_statements_without_results() {
    let mut engine = staged_engine();
    let rs = run_query(&mut engine, "DELETE FROM sheet_data WHERE Region = 'South'").unwrap();
    assert!(!rs.has_columns());

    let rs = run_query(&mut engine, "SELECT Region FROM sheet_data WHERE 1 = 0").unwrap();
    assert_eq!(rs.columns, vec!["Region"]);
    assert!(rs.is_empty());
}
