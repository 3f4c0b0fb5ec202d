//! Staging loader: atomic table replacement and failure rollback.

use chrono::{DateTime, Utc};
use sheetsql::engine::{Engine, EngineError, EngineResult, ResultSet, SqliteEngine};
use sheetsql::pipeline::{
    infer_schema, ColumnSchema, DuplicateHeaders, LoadOptions, LoadStrategy, PipelineError,
    RawRow, StagingLoader,
};
use sheetsql::value::Value;

/// Delegates to SQLite but fails once `fail_at` data rows have been inserted.
struct FailingEngine {
    inner: SqliteEngine,
    fail_at: usize,
    inserted: usize,
}

impl FailingEngine {
    fn new(inner: SqliteEngine, fail_at: usize) -> Self {
        Self {
            inner,
            fail_at,
            inserted: 0,
        }
    }

    fn injected() -> EngineError {
        EngineError::Execution("injected insert failure".to_string())
    }
}

impl Engine for FailingEngine {
    fn execute(&mut self, sql: &str) -> EngineResult<ResultSet> {
        if sql.starts_with("INSERT") {
            if self.inserted >= self.fail_at {
                return Err(Self::injected());
            }
            self.inserted += 1;
        }
        self.inner.execute(sql)
    }

    fn begin(&mut self) -> EngineResult<()> {
        self.inner.begin()
    }

    fn commit(&mut self) -> EngineResult<()> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> EngineResult<()> {
        self.inner.rollback()
    }

    fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Option<String>>],
    ) -> EngineResult<usize> {
        if self.inserted + rows.len() > self.fail_at {
            return Err(Self::injected());
        }
        self.inserted += rows.len();
        self.inner.insert_rows(table, columns, rows)
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }
}

/// Delegates to SQLite but answers the post-load row count itself.
struct MiscountingEngine {
    inner: SqliteEngine,
    count: Option<i64>,
}

impl Engine for MiscountingEngine {
    fn execute(&mut self, sql: &str) -> EngineResult<ResultSet> {
        if sql.starts_with("SELECT COUNT(*)") {
            return match self.count {
                Some(n) => Ok(ResultSet::new(
                    vec!["row_count".to_string()],
                    vec![vec![Value::Integer(n)]],
                )),
                None => Err(EngineError::Execution("database is locked".to_string())),
            };
        }
        self.inner.execute(sql)
    }

    fn begin(&mut self) -> EngineResult<()> {
        self.inner.begin()
    }

    fn commit(&mut self) -> EngineResult<()> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> EngineResult<()> {
        self.inner.rollback()
    }

    fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Option<String>>],
    ) -> EngineResult<usize> {
        self.inner.insert_rows(table, columns, rows)
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }
}

fn at() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
}

fn schema(names: &[&str]) -> ColumnSchema {
    let header: Vec<Value> = names.iter().map(|n| Value::from(*n)).collect();
    infer_schema(&header, at(), DuplicateHeaders::Suffix).unwrap()
}

fn numbered_rows(n: usize) -> Vec<RawRow> {
    (0..n)
        .map(|i| vec![Value::Integer(i as i64), Value::from(format!("row {}", i))])
        .collect()
}

fn loader(strategy: LoadStrategy, batch_rows: usize) -> StagingLoader {
    StagingLoader::new(LoadOptions {
        table: "sheet_data".to_string(),
        strategy,
        batch_rows,
    })
}

fn staged(engine: &mut dyn Engine) -> ResultSet {
    engine
        .execute("SELECT * FROM sheet_data ORDER BY CAST(A AS INTEGER)")
        .unwrap()
}

#[test]
fn test_round_trip_stages_text() {
    let mut engine = SqliteEngine::open_in_memory().unwrap();
    let rows = vec![
        vec![Value::Integer(2), Value::from("y")],
        vec![Value::Integer(1), Value::from("x")],
    ];
    let report = StagingLoader::default()
        .load(&mut engine, &schema(&["A", "B"]), &rows)
        .unwrap();
    assert_eq!(report.rows_submitted, 2);
    assert_eq!(report.rows_loaded, Some(2));
    assert!(report.is_consistent());

    let rs = engine.execute("SELECT * FROM sheet_data ORDER BY A").unwrap();
    let records = rs.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["A"], Value::from("1"));
    assert_eq!(records[0]["B"], Value::from("x"));
    assert_eq!(records[1]["A"], Value::from("2"));
    assert_eq!(records[1]["B"], Value::from("y"));
}

#[test]
fn test_both_strategies_load_every_row() {
    for strategy in [LoadStrategy::Batched, LoadStrategy::RowWise] {
        let mut engine = SqliteEngine::open_in_memory().unwrap();
        let report = loader(strategy, 7)
            .load(&mut engine, &schema(&["A", "B"]), &numbered_rows(50))
            .unwrap();
        assert_eq!(report.rows_loaded, Some(50), "{:?}", strategy);
        assert_eq!(staged(&mut engine).len(), 50);
    }
}

#[test]
fn test_quotes_and_nulls_survive() {
    for strategy in [LoadStrategy::Batched, LoadStrategy::RowWise] {
        let mut engine = SqliteEngine::open_in_memory().unwrap();
        let rows = vec![vec![Value::from("O'Brien"), Value::Null, Value::from("a \"b\"")]];
        loader(strategy, 10)
            .load(&mut engine, &schema(&["it's", "say \"x\"", "C"]), &rows)
            .unwrap();

        let rs = engine
            .execute("SELECT \"it's\", \"say \"\"x\"\"\", C FROM sheet_data")
            .unwrap();
        assert_eq!(
            rs.rows[0],
            vec![Value::from("O'Brien"), Value::Null, Value::from("a \"b\"")],
            "{:?}",
            strategy
        );
    }
}

#[test]
fn test_reload_replaces_previous_table() {
    let mut engine = SqliteEngine::open_in_memory().unwrap();
    let loader = StagingLoader::default();
    loader
        .load(&mut engine, &schema(&["A", "B"]), &numbered_rows(5))
        .unwrap();
    loader
        .load(&mut engine, &schema(&["X"]), &[vec![Value::from("only")]])
        .unwrap();

    let rs = engine.execute("SELECT * FROM sheet_data").unwrap();
    assert_eq!(rs.columns, vec!["X"]);
    assert_eq!(rs.len(), 1);
}

#[test]
fn test_header_only_range_creates_empty_table() {
    let mut engine = SqliteEngine::open_in_memory().unwrap();
    let report = StagingLoader::default()
        .load(&mut engine, &schema(&["A"]), &[])
        .unwrap();
    assert_eq!(report.rows_loaded, Some(0));
    assert!(engine.table_exists("sheet_data").unwrap());
}

#[test]
fn test_failure_midway_keeps_previous_contents() {
    for strategy in [LoadStrategy::Batched, LoadStrategy::RowWise] {
        let mut sqlite = SqliteEngine::open_in_memory().unwrap();
        StagingLoader::default()
            .load(&mut sqlite, &schema(&["A", "B"]), &numbered_rows(3))
            .unwrap();
        let before = staged(&mut sqlite);

        let mut engine = FailingEngine::new(sqlite, 10);
        let err = loader(strategy, 5)
            .load(&mut engine, &schema(&["A", "B"]), &numbered_rows(20))
            .unwrap_err();

        match err {
            PipelineError::InsertFailed { row, .. } => assert_eq!(row, 10, "{:?}", strategy),
            other => panic!("expected InsertFailed, got {:?}", other),
        }
        assert!(!engine.in_transaction());
        assert_eq!(staged(&mut engine), before);
    }
}

#[test]
fn test_failure_on_first_load_leaves_no_table() {
    let mut engine = FailingEngine::new(SqliteEngine::open_in_memory().unwrap(), 0);
    let err = StagingLoader::default()
        .load(&mut engine, &schema(&["A", "B"]), &numbered_rows(4))
        .unwrap_err();
    assert_eq!(err.code(), "INSERT_FAILED");
    assert!(!engine.inner.table_exists("sheet_data").unwrap());
}

#[test]
fn test_count_mismatch_is_reported_and_load_kept() {
    let mut engine = MiscountingEngine {
        inner: SqliteEngine::open_in_memory().unwrap(),
        count: Some(1),
    };
    let report = StagingLoader::default()
        .load(&mut engine, &schema(&["A", "B"]), &numbered_rows(2))
        .unwrap();

    assert_eq!(report.rows_submitted, 2);
    assert_eq!(report.rows_loaded, Some(1));
    assert!(!report.is_consistent());
    assert_eq!(
        report.warning.as_deref(),
        Some("staged 1 rows but 2 were submitted")
    );
    assert!(!engine.in_transaction());
    assert_eq!(staged(&mut engine.inner).len(), 2);
}

#[test]
fn test_failed_recount_is_reported_and_load_kept() {
    let mut engine = MiscountingEngine {
        inner: SqliteEngine::open_in_memory().unwrap(),
        count: None,
    };
    let report = StagingLoader::default()
        .load(&mut engine, &schema(&["A", "B"]), &numbered_rows(3))
        .unwrap();

    assert_eq!(report.rows_loaded, None);
    assert_eq!(
        report.warning.as_deref(),
        Some("could not verify the staged row count")
    );
    assert_eq!(staged(&mut engine.inner).len(), 3);
}

#[test]
fn test_nul_cell_needs_batched_strategy() {
    let rows = vec![
        vec![Value::from("ok"), Value::from("fine")],
        vec![Value::from("a\0b"), Value::from("x")],
    ];

    let mut engine = SqliteEngine::open_in_memory().unwrap();
    let err = loader(LoadStrategy::RowWise, 10)
        .load(&mut engine, &schema(&["A", "B"]), &rows)
        .unwrap_err();
    match &err {
        PipelineError::InsertFailed { row, source } => {
            assert_eq!(*row, 1);
            assert!(source.to_string().contains("NUL"));
        }
        other => panic!("expected InsertFailed, got {:?}", other),
    }
    assert!(!engine.table_exists("sheet_data").unwrap());

    let mut engine = SqliteEngine::open_in_memory().unwrap();
    loader(LoadStrategy::Batched, 10)
        .load(&mut engine, &schema(&["A", "B"]), &rows)
        .unwrap();
    let rs = engine
        .execute("SELECT A FROM sheet_data WHERE B = 'x'")
        .unwrap();
    assert_eq!(rs.rows[0][0], Value::from("a\0b"));
}

#[test]
fn test_open_transaction_is_rolled_back_before_load() {
    let mut engine = SqliteEngine::open_in_memory().unwrap();
    engine.execute("BEGIN").unwrap();
    engine.execute("CREATE TABLE scratch (x TEXT)").unwrap();
    assert!(engine.in_transaction());

    let report = StagingLoader::default()
        .load(&mut engine, &schema(&["A", "B"]), &numbered_rows(2))
        .unwrap();
    assert_eq!(report.rows_loaded, Some(2));
    assert!(!engine.in_transaction());
    assert!(!engine.table_exists("scratch").unwrap());
}
