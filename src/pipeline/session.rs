//! Explicit session context.
//!
//! A [`Session`] owns one engine connection plus the source and destination
//! collaborators, and remembers the current source range and destination
//! spreadsheet. Each stage method catches its failure at the boundary, logs
//! the full diagnostic and returns a [`PipelineError`]; the session stays
//! usable afterwards.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info};

use super::clock::{Clock, SystemClock};
use super::error::{PipelineError, PipelineResult};
use super::export::{title_timestamp, ExportReport, ResultExporter, DEFAULT_TAB_PREFIX};
use super::loader::{LoadOptions, LoadReport, StagingLoader};
use super::query::run_query;
use super::schema::{infer_schema, ColumnSchema, DuplicateHeaders};
use super::source::fetch_table;
use crate::engine::{Engine, ResultSet};
use crate::sheets::{A1Range, CellRange, SheetDestination, SheetSource, SpreadsheetInfo, TabInfo};

pub const DEFAULT_RANGE: &str = "A1:Z1000";
pub const DEFAULT_SPREADSHEET_PREFIX: &str = "SQL Export";

/// Tunables for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub load: LoadOptions,
    pub default_range: String,
    pub duplicate_headers: DuplicateHeaders,
    pub tab_prefix: String,
    pub spreadsheet_prefix: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            default_range: DEFAULT_RANGE.to_string(),
            duplicate_headers: DuplicateHeaders::default(),
            tab_prefix: DEFAULT_TAB_PREFIX.to_string(),
            spreadsheet_prefix: DEFAULT_SPREADSHEET_PREFIX.to_string(),
        }
    }
}

/// Outcome of a combined query and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExport {
    pub result: ResultSet,
    pub export: ExportReport,
}

#[derive(Debug, Default)]
struct Selection {
    source: Option<CellRange>,
    destination: Option<String>,
    schema: Option<ColumnSchema>,
}

pub struct Session {
    engine: Mutex<Box<dyn Engine>>,
    source: Arc<dyn SheetSource>,
    destination: Arc<dyn SheetDestination>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    loader: StagingLoader,
    exporter: ResultExporter,
    selection: Mutex<Selection>,
}

impl Session {
    pub fn new(
        engine: Box<dyn Engine>,
        source: Arc<dyn SheetSource>,
        destination: Arc<dyn SheetDestination>,
        settings: SessionSettings,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            engine: Mutex::new(engine),
            source,
            destination,
            loader: StagingLoader::new(settings.load.clone()),
            exporter: ResultExporter::new(settings.tab_prefix.clone(), clock.clone()),
            clock,
            settings,
            selection: Mutex::new(Selection::default()),
        }
    }

    /// Replace the time source used for synthesized names and titles.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.exporter = ResultExporter::new(self.settings.tab_prefix.clone(), clock.clone());
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Staging table name queries should target.
    pub fn table(&self) -> &str {
        &self.settings.load.table
    }

    pub async fn list_spreadsheets(&self) -> PipelineResult<Vec<SpreadsheetInfo>> {
        let result = self
            .source
            .list_spreadsheets()
            .await
            .map_err(PipelineError::from_source);
        logged("list_spreadsheets", result)
    }

    pub async fn list_tabs(&self, spreadsheet_id: &str) -> PipelineResult<Vec<TabInfo>> {
        let result = self
            .source
            .list_tabs(spreadsheet_id)
            .await
            .map_err(PipelineError::from_source);
        logged("list_tabs", result)
    }

    /// Remember a source range. `None` selects the configured default range.
    pub async fn select_source(
        &self,
        spreadsheet_id: &str,
        tab: &str,
        range: Option<&str>,
    ) -> PipelineResult<CellRange> {
        let range = range
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.settings.default_range.as_str());
        let parsed = A1Range::parse(range).map_err(PipelineError::SourceUnavailable);
        logged("select_source", parsed)?;

        let selected = CellRange::new(spreadsheet_id, tab, range);
        self.selection.lock().await.source = Some(selected.clone());
        info!(range = %selected.a1_notation(), spreadsheet = %spreadsheet_id, "source selected");
        Ok(selected)
    }

    pub async fn selected_source(&self) -> Option<CellRange> {
        self.selection.lock().await.source.clone()
    }

    pub async fn select_destination(&self, spreadsheet_id: &str) {
        self.selection.lock().await.destination = Some(spreadsheet_id.to_string());
        info!(spreadsheet = %spreadsheet_id, "destination selected");
    }

    pub async fn selected_destination(&self) -> Option<String> {
        self.selection.lock().await.destination.clone()
    }

    /// Column names of the last successful load.
    pub async fn columns(&self) -> Option<Vec<String>> {
        self.selection
            .lock()
            .await
            .schema
            .as_ref()
            .map(ColumnSchema::names)
    }

    /// Fetch `range`, infer its schema and replace the staging table.
    pub async fn load(&self, range: &CellRange) -> PipelineResult<LoadReport> {
        let result = self.load_inner(range).await;
        logged("load", result)
    }

    /// Load the currently selected source range.
    pub async fn load_selected(&self) -> PipelineResult<LoadReport> {
        let range = self.selected_source().await;
        match range {
            Some(range) => self.load(&range).await,
            None => logged("load", Err(PipelineError::NoSourceSelected)),
        }
    }

    async fn load_inner(&self, range: &CellRange) -> PipelineResult<LoadReport> {
        let table = fetch_table(self.source.as_ref(), range).await?;
        let schema = infer_schema(
            &table.header,
            self.clock.now(),
            self.settings.duplicate_headers,
        )?;

        let report = {
            let mut engine = self.engine.lock().await;
            self.loader.load(engine.as_mut(), &schema, &table.rows)?
        };

        let mut selection = self.selection.lock().await;
        selection.source = Some(range.clone());
        selection.schema = Some(schema);
        Ok(report)
    }

    /// Run a query against the staged data.
    pub async fn query(&self, sql: &str) -> PipelineResult<ResultSet> {
        let result = {
            let mut engine = self.engine.lock().await;
            run_query(engine.as_mut(), sql)
        };
        logged("query", result)
    }

    /// Export `result` to a new tab of `spreadsheet_id`.
    pub async fn export(
        &self,
        spreadsheet_id: &str,
        result: &ResultSet,
    ) -> PipelineResult<ExportReport> {
        let report = self
            .exporter
            .export(self.destination.as_ref(), spreadsheet_id, result)
            .await;
        logged("export", report)
    }

    /// Export `result` to the selected destination.
    pub async fn export_to_selected(&self, result: &ResultSet) -> PipelineResult<ExportReport> {
        match self.selected_destination().await {
            Some(id) => self.export(&id, result).await,
            None => logged("export", Err(PipelineError::NoDestinationSelected)),
        }
    }

    /// Run `sql` and export its result. `None` uses the selected destination.
    pub async fn query_and_export(
        &self,
        sql: &str,
        spreadsheet_id: Option<&str>,
    ) -> PipelineResult<QueryExport> {
        let result = self.query(sql).await?;
        let export = match spreadsheet_id {
            Some(id) => self.export(id, &result).await?,
            None => self.export_to_selected(&result).await?,
        };
        Ok(QueryExport { result, export })
    }

    /// Create a destination spreadsheet and select it.
    pub async fn create_destination(&self, title: Option<&str>) -> PipelineResult<SpreadsheetInfo> {
        let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => t.to_string(),
            None => format!(
                "{} {}",
                self.settings.spreadsheet_prefix,
                title_timestamp(self.clock.now())
            ),
        };
        let created = self
            .destination
            .create_spreadsheet(&title)
            .await
            .map_err(|e| PipelineError::from_sheets(e, PipelineError::DestinationCreateFailed));
        let created = logged("create_destination", created)?;

        self.select_destination(&created.id).await;
        info!(spreadsheet = %created.id, title = %created.name, "destination created");
        Ok(created)
    }
}

fn logged<T>(operation: &str, result: PipelineResult<T>) -> PipelineResult<T> {
    if let Err(err) = &result {
        error!(operation, code = err.code(), detail = %err.detail(), "{}", err.user_message());
    }
    result
}
