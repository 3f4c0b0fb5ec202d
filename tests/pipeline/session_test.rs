//! End-to-end session flows over the workbook backend.

use std::sync::Arc;

use async_trait::async_trait;
use sheetsql::engine::SqliteEngine;
use sheetsql::pipeline::{FixedClock, PipelineError, Session, SessionSettings};
use sheetsql::sheets::{
    AuthError, CellRange, SheetDestination, SheetSource, SheetsError, SheetsResult,
    SpreadsheetInfo, TabInfo, Workbook,
};
use sheetsql::value::Value;

const LOADED_AT: i64 = 1_700_000_000_000;

fn workbook() -> Arc<Workbook> {
    Arc::new(
        Workbook::new()
            .with_tab(
                "src",
                "Orders",
                "Q1",
                vec![
                    vec!["Region".into(), Value::Null, "Amount".into()],
                    vec!["North".into(), "a".into(), Value::Integer(120)],
                    vec!["South".into(), "b".into(), Value::Real(80.5)],
                    vec!["North".into(), Value::Null, Value::Integer(30)],
                ],
            )
            .with_tab("src", "Orders", "Empty", vec![])
            .with_tab("dest", "Reports", "Sheet1", vec![]),
    )
}

fn session(workbook: Arc<Workbook>) -> Session {
    Session::new(
        Box::new(SqliteEngine::open_in_memory().unwrap()),
        workbook.clone(),
        workbook,
        SessionSettings::default(),
    )
    .with_clock(Arc::new(FixedClock::from_millis(LOADED_AT)))
}

#[tokio::test]
async fn test_load_query_export() {
    let workbook = workbook();
    let session = session(workbook.clone());

    let range = session.select_source("src", "Q1", None).await.unwrap();
    assert_eq!(range.range, "A1:Z1000");

    let report = session.load_selected().await.unwrap();
    assert_eq!(report.rows_submitted, 3);
    assert_eq!(report.rows_loaded, Some(3));
    assert_eq!(
        session.columns().await.unwrap(),
        vec!["Region", "col_1_1700000000000", "Amount"]
    );

    session.select_destination("dest").await;
    let done = session
        .query_and_export(
            "SELECT Region, COUNT(*) AS n FROM sheet_data GROUP BY Region ORDER BY Region",
            None,
        )
        .await
        .unwrap();
    assert_eq!(done.result.len(), 2);

    let rows = workbook
        .tab_rows("dest", &done.export.tab_title)
        .await
        .unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Value::from("Region"), Value::from("n")],
            vec![Value::from("North"), Value::from("2")],
            vec![Value::from("South"), Value::from("1")],
        ]
    );
}

#[tokio::test]
async fn test_post_load_count_matches_fetched_minus_header() {
    let session = session(workbook());
    for range in ["A1:C2", "A1:C3", "A1:Z1000"] {
        let report = session
            .load(&CellRange::new("src", "Q1", range))
            .await
            .unwrap();
        let rs = session.query("SELECT COUNT(*) FROM sheet_data").await.unwrap();
        assert_eq!(rs.rows[0][0], Value::Integer(report.rows_submitted as i64));
    }
}

#[tokio::test]
async fn test_empty_range() {
    let session = session(workbook());
    let err = session
        .load(&CellRange::new("src", "Empty", "A1:Z1000"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::EmptyRange(ref r) if r == "'Empty'!A1:Z1000"));
    assert!(session.columns().await.is_none());
}

#[tokio::test]
async fn test_source_errors_keep_session_usable() {
    let session = session(workbook());
    let err = session
        .load(&CellRange::new("missing", "Q1", "A1:B2"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SOURCE_UNAVAILABLE");

    session
        .load(&CellRange::new("src", "Q1", "A1:C4"))
        .await
        .unwrap();
    let rs = session.query("SELECT * FROM sheet_data").await.unwrap();
    assert_eq!(rs.len(), 3);
}

#[tokio::test]
async fn test_failed_query_leaves_staging_table() {
    let session = session(workbook());
    session
        .load(&CellRange::new("src", "Q1", "A1:C4"))
        .await
        .unwrap();
    let err = session.query("SELECT * FROM nope").await.unwrap_err();
    assert_eq!(err.code(), "QUERY_EXECUTION_ERROR");
    assert_eq!(session.query("SELECT * FROM sheet_data").await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_selection_required() {
    let session = session(workbook());
    assert!(matches!(
        session.load_selected().await,
        Err(PipelineError::NoSourceSelected)
    ));
    let result = session.query("SELECT 1 AS one").await.unwrap();
    assert!(matches!(
        session.export_to_selected(&result).await,
        Err(PipelineError::NoDestinationSelected)
    ));
}

#[tokio::test]
async fn test_invalid_range_rejected_on_select() {
    let session = session(workbook());
    let err = session
        .select_source("src", "Q1", Some("A1:B2:C3"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::SourceUnavailable(SheetsError::InvalidRange(_))
    ));
    assert!(session.selected_source().await.is_none());
}

#[tokio::test]
async fn test_create_destination_selects_it() {
    let workbook = workbook();
    let session = session(workbook.clone());
    let created = session.create_destination(None).await.unwrap();
    assert_eq!(created.name, "SQL Export 2023-11-14T22-13-20-000Z");
    assert_eq!(session.selected_destination().await, Some(created.id.clone()));

    let result = session.query("SELECT 'hi' AS greeting").await.unwrap();
    let report = session.export_to_selected(&result).await.unwrap();
    assert_eq!(report.spreadsheet_id, created.id);

    let named = session.create_destination(Some("Team report")).await.unwrap();
    assert_eq!(named.name, "Team report");
}

/// A source whose credentials are never valid.
struct SignedOut;

#[async_trait]
impl SheetSource for SignedOut {
    async fn get_range(&self, _range: &CellRange) -> SheetsResult<Vec<Vec<Value>>> {
        Err(AuthError::Missing("no token".to_string()).into())
    }

    async fn list_spreadsheets(&self) -> SheetsResult<Vec<SpreadsheetInfo>> {
        Err(AuthError::Missing("no token".to_string()).into())
    }

    async fn list_tabs(&self, _spreadsheet_id: &str) -> SheetsResult<Vec<TabInfo>> {
        Err(AuthError::Missing("no token".to_string()).into())
    }
}

#[tokio::test]
async fn test_auth_failure_is_distinct() {
    let session = Session::new(
        Box::new(SqliteEngine::open_in_memory().unwrap()),
        Arc::new(SignedOut),
        workbook(),
        SessionSettings::default(),
    );
    let err = session.list_spreadsheets().await.unwrap_err();
    assert!(matches!(err, PipelineError::Auth(_)));
    assert_eq!(err.code(), "AUTH_ERROR");

    let err = session
        .load(&CellRange::new("src", "Q1", "A1:B2"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "AUTH_ERROR");
}

/// A remote API that answers every call with 401 Unauthorized.
struct ExpiredToken;

impl ExpiredToken {
    fn unauthorized() -> SheetsError {
        SheetsError::api(401, "Request had invalid authentication credentials.")
    }
}

#[async_trait]
impl SheetSource for ExpiredToken {
    async fn get_range(&self, _range: &CellRange) -> SheetsResult<Vec<Vec<Value>>> {
        Err(Self::unauthorized())
    }

    async fn list_spreadsheets(&self) -> SheetsResult<Vec<SpreadsheetInfo>> {
        Err(Self::unauthorized())
    }

    async fn list_tabs(&self, _spreadsheet_id: &str) -> SheetsResult<Vec<TabInfo>> {
        Err(Self::unauthorized())
    }
}

#[async_trait]
impl SheetDestination for ExpiredToken {
    async fn create_spreadsheet(&self, _title: &str) -> SheetsResult<SpreadsheetInfo> {
        Err(Self::unauthorized())
    }

    async fn add_tab(&self, _spreadsheet_id: &str, _title: &str) -> SheetsResult<TabInfo> {
        Err(Self::unauthorized())
    }

    async fn write_range(
        &self,
        _spreadsheet_id: &str,
        _range: &str,
        _values: &[Vec<String>],
    ) -> SheetsResult<()> {
        Err(Self::unauthorized())
    }
}

#[tokio::test]
async fn test_unauthorized_status_is_auth_at_every_stage() {
    let expired = Arc::new(ExpiredToken);
    let session = Session::new(
        Box::new(SqliteEngine::open_in_memory().unwrap()),
        expired.clone(),
        expired,
        SessionSettings::default(),
    );

    let err = session
        .load(&CellRange::new("src", "Q1", "A1:B2"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Auth(AuthError::Rejected(_))));

    assert_eq!(session.list_tabs("src").await.unwrap_err().code(), "AUTH_ERROR");
    assert_eq!(
        session.create_destination(None).await.unwrap_err().code(),
        "AUTH_ERROR"
    );

    let result = session.query("SELECT 1 AS one").await.unwrap();
    let err = session.export("dest", &result).await.unwrap_err();
    assert_eq!(err.code(), "AUTH_ERROR");
    assert!(err.detail().contains("invalid authentication credentials"));
}
