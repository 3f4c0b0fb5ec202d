//! Result exporter against the workbook destination.

use std::sync::Arc;

use async_trait::async_trait;
use sheetsql::engine::ResultSet;
use sheetsql::pipeline::{FixedClock, PipelineError, ResultExporter};
use sheetsql::sheets::{
    SheetDestination, SheetsError, SheetsResult, SpreadsheetInfo, TabInfo, Workbook,
};
use sheetsql::value::Value;

/// Wraps a workbook and fails the chosen call.
struct FailingDestination {
    inner: Workbook,
    fail_add_tab: bool,
    fail_write: bool,
}

#[async_trait]
impl SheetDestination for FailingDestination {
    async fn create_spreadsheet(&self, title: &str) -> SheetsResult<SpreadsheetInfo> {
        self.inner.create_spreadsheet(title).await
    }

    async fn add_tab(&self, spreadsheet_id: &str, title: &str) -> SheetsResult<TabInfo> {
        if self.fail_add_tab {
            return Err(SheetsError::api(403, "The caller does not have permission"));
        }
        self.inner.add_tab(spreadsheet_id, title).await
    }

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> SheetsResult<()> {
        if self.fail_write {
            return Err(SheetsError::api(500, "Internal error encountered."));
        }
        self.inner.write_range(spreadsheet_id, range, values).await
    }
}

fn exporter() -> ResultExporter {
    ResultExporter::new(
        "Query Result",
        Arc::new(FixedClock::from_millis(1_700_000_000_123)),
    )
}

fn sample() -> ResultSet {
    ResultSet::new(
        vec!["A".to_string(), "B".to_string()],
        vec![vec![Value::Integer(1), Value::from("x")]],
    )
}

fn destination() -> Workbook {
    Workbook::new().with_tab("dest", "Results", "Sheet1", vec![])
}

#[tokio::test]
async fn test_export_writes_header_and_rows() {
    let workbook = destination();
    let report = exporter().export(&workbook, "dest", &sample()).await.unwrap();

    assert_eq!(report.tab_title, "Query Result 2023-11-14T22-13-20-123Z");
    assert_eq!(report.range, "'Query Result 2023-11-14T22-13-20-123Z'!A1");
    assert_eq!(report.rows_written, 1);

    let rows = workbook.tab_rows("dest", &report.tab_title).await.unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Value::from("A"), Value::from("B")],
            vec![Value::from("1"), Value::from("x")],
        ]
    );
}

#[tokio::test]
async fn test_consecutive_exports_create_distinct_tabs() {
    let workbook = destination();
    let exporter = exporter();
    let first = exporter.export(&workbook, "dest", &sample()).await.unwrap();
    let second = exporter.export(&workbook, "dest", &sample()).await.unwrap();
    assert_ne!(first.tab_title, second.tab_title);
    assert_ne!(first.tab_id, second.tab_id);
}

#[tokio::test]
async fn test_display_conversion() {
    let workbook = destination();
    let result = ResultSet::new(
        vec!["n".to_string(), "r".to_string(), "b".to_string(), "z".to_string()],
        vec![vec![
            Value::Integer(-3),
            Value::Real(2.5),
            Value::Bool(false),
            Value::Null,
        ]],
    );
    let report = exporter().export(&workbook, "dest", &result).await.unwrap();
    let rows = workbook.tab_rows("dest", &report.tab_title).await.unwrap();
    // The null cell is written as "" which the workbook stores as empty.
    assert_eq!(
        rows[1],
        vec![
            Value::from("-3"),
            Value::from("2.5"),
            Value::from("false"),
            Value::Null
        ]
    );
}

#[tokio::test]
async fn test_no_columns_is_rejected_before_any_tab() {
    let workbook = destination();
    let err = exporter()
        .export(&workbook, "dest", &ResultSet::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::ExportEmptyResult));
    assert_eq!(workbook.snapshot().await.spreadsheets[0].tabs.len(), 1);
}

#[tokio::test]
async fn test_tab_create_failure_writes_nothing() {
    let dest = FailingDestination {
        inner: destination(),
        fail_add_tab: true,
        fail_write: false,
    };
    let err = exporter().export(&dest, "dest", &sample()).await.unwrap_err();
    assert_eq!(err.code(), "EXPORT_TAB_CREATE_FAILED");
    assert!(err.detail().contains("permission"));
    assert_eq!(dest.inner.snapshot().await.spreadsheets[0].tabs.len(), 1);
}

#[tokio::test]
async fn test_write_failure_leaves_empty_tab() {
    let dest = FailingDestination {
        inner: destination(),
        fail_add_tab: false,
        fail_write: true,
    };
    let err = exporter().export(&dest, "dest", &sample()).await.unwrap_err();
    let PipelineError::ExportWriteFailed { tab, .. } = &err else {
        panic!("expected ExportWriteFailed, got {:?}", err);
    };
    let rows = dest.inner.tab_rows("dest", tab).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_missing_destination_spreadsheet() {
    let workbook = destination();
    let err = exporter()
        .export(&workbook, "nope", &sample())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ExportTabCreateFailed(SheetsError::SpreadsheetNotFound(_))
    ));
}
