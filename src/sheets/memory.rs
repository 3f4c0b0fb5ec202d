//! Workbook backend: spreadsheets held in memory, optionally backed by a JSON file.
//!
//! Used for offline runs of the CLI and as the fake collaborator in tests.
//! The file format is:
//!
//! ```json
//! {
//!   "spreadsheets": [
//!     { "id": "sales", "name": "Sales 2024",
//!       "tabs": [ { "title": "Q1", "rows": [["Region", "Amount"], ["North", 120]] } ] }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::a1::{split_notation, A1Range};
use super::{
    CellRange, SheetDestination, SheetSource, SheetsError, SheetsResult, SpreadsheetInfo, TabInfo,
};
use crate::value::Value;

/// Title of the tab every new spreadsheet starts with.
const DEFAULT_TAB_TITLE: &str = "Sheet1";

/// Serialized form of a workbook store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkbookData {
    #[serde(default)]
    pub spreadsheets: Vec<SpreadsheetData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tabs: Vec<TabData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabData {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl SpreadsheetData {
    fn tab(&self, title: &str) -> Option<&TabData> {
        self.tabs.iter().find(|t| t.title == title)
    }

    fn tab_mut(&mut self, title: &str) -> Option<&mut TabData> {
        self.tabs.iter_mut().find(|t| t.title == title)
    }

    fn next_tab_id(&self) -> i64 {
        self.tabs.iter().map(|t| t.id + 1).max().unwrap_or(0)
    }
}

impl WorkbookData {
    fn spreadsheet(&self, id: &str) -> SheetsResult<&SpreadsheetData> {
        self.spreadsheets
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(id.to_string()))
    }

    fn spreadsheet_mut(&mut self, id: &str) -> SheetsResult<&mut SpreadsheetData> {
        self.spreadsheets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(id.to_string()))
    }
}

/// In-memory spreadsheet store implementing both collaborator traits.
#[derive(Debug, Default)]
pub struct Workbook {
    data: RwLock<WorkbookData>,
    path: Option<PathBuf>,
}

impl Workbook {
    /// Create an empty, memory-only workbook store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing data.
    pub fn from_data(data: WorkbookData) -> Self {
        Self {
            data: RwLock::new(data),
            path: None,
        }
    }

    /// Open a JSON-backed store. A missing file starts empty and is created
    /// on the first write.
    pub async fn open<P: AsRef<Path>>(path: P) -> SheetsResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => WorkbookData::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            data: RwLock::new(data),
            path: Some(path),
        })
    }

    /// Add a tab with contents, creating the spreadsheet if needed.
    ///
    /// Builder-style helper for seeding a store before it is shared.
    pub fn with_tab(
        mut self,
        spreadsheet_id: &str,
        spreadsheet_name: &str,
        title: &str,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        let data = self.data.get_mut();
        let index = match data.spreadsheets.iter().position(|s| s.id == spreadsheet_id) {
            Some(index) => index,
            None => {
                data.spreadsheets.push(SpreadsheetData {
                    id: spreadsheet_id.to_string(),
                    name: spreadsheet_name.to_string(),
                    tabs: Vec::new(),
                });
                data.spreadsheets.len() - 1
            }
        };
        let spreadsheet = &mut data.spreadsheets[index];
        let id = spreadsheet.next_tab_id();
        match spreadsheet.tab_mut(title) {
            Some(tab) => tab.rows = rows,
            None => spreadsheet.tabs.push(TabData {
                id,
                title: title.to_string(),
                rows,
            }),
        }
        self
    }

    /// Contents of one tab, if it exists.
    pub async fn tab_rows(&self, spreadsheet_id: &str, title: &str) -> Option<Vec<Vec<Value>>> {
        let data = self.data.read().await;
        data.spreadsheet(spreadsheet_id)
            .ok()
            .and_then(|s| s.tab(title))
            .map(|t| t.rows.clone())
    }

    /// Copy of the whole store.
    pub async fn snapshot(&self) -> WorkbookData {
        self.data.read().await.clone()
    }

    async fn persist(&self, data: &WorkbookData) -> SheetsResult<()> {
        if let Some(path) = &self.path {
            let json = serde_json::to_string_pretty(data)?;
            tokio::fs::write(path, json).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SheetSource for Workbook {
    async fn get_range(&self, range: &CellRange) -> SheetsResult<Vec<Vec<Value>>> {
        let parsed = A1Range::parse(&range.range)?;
        let data = self.data.read().await;
        let spreadsheet = data.spreadsheet(&range.spreadsheet_id)?;
        let tab = spreadsheet
            .tab(&range.tab)
            .ok_or_else(|| SheetsError::TabNotFound {
                spreadsheet_id: range.spreadsheet_id.clone(),
                tab: range.tab.clone(),
            })?;
        Ok(parsed.slice(&tab.rows))
    }

    async fn list_spreadsheets(&self) -> SheetsResult<Vec<SpreadsheetInfo>> {
        let data = self.data.read().await;
        let mut list: Vec<SpreadsheetInfo> = data
            .spreadsheets
            .iter()
            .map(|s| SpreadsheetInfo {
                id: s.id.clone(),
                name: s.name.clone(),
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn list_tabs(&self, spreadsheet_id: &str) -> SheetsResult<Vec<TabInfo>> {
        let data = self.data.read().await;
        let mut tabs: Vec<TabInfo> = data
            .spreadsheet(spreadsheet_id)?
            .tabs
            .iter()
            .map(|t| TabInfo {
                id: t.id,
                title: t.title.clone(),
            })
            .collect();
        tabs.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(tabs)
    }
}

#[async_trait]
impl SheetDestination for Workbook {
    async fn create_spreadsheet(&self, title: &str) -> SheetsResult<SpreadsheetInfo> {
        let mut data = self.data.write().await;
        let id = uuid::Uuid::new_v4().simple().to_string();
        data.spreadsheets.push(SpreadsheetData {
            id: id.clone(),
            name: title.to_string(),
            tabs: vec![TabData {
                id: 0,
                title: DEFAULT_TAB_TITLE.to_string(),
                rows: Vec::new(),
            }],
        });
        self.persist(&data).await?;
        Ok(SpreadsheetInfo {
            id,
            name: title.to_string(),
        })
    }

    async fn add_tab(&self, spreadsheet_id: &str, title: &str) -> SheetsResult<TabInfo> {
        let mut data = self.data.write().await;
        let spreadsheet = data.spreadsheet_mut(spreadsheet_id)?;
        if spreadsheet
            .tabs
            .iter()
            .any(|t| t.title.eq_ignore_ascii_case(title))
        {
            return Err(SheetsError::TabExists {
                spreadsheet_id: spreadsheet_id.to_string(),
                tab: title.to_string(),
            });
        }
        let tab = TabInfo {
            id: spreadsheet.next_tab_id(),
            title: title.to_string(),
        };
        spreadsheet.tabs.push(TabData {
            id: tab.id,
            title: tab.title.clone(),
            rows: Vec::new(),
        });
        self.persist(&data).await?;
        Ok(tab)
    }

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> SheetsResult<()> {
        let (tab_title, cells) = split_notation(range)?;
        let origin = A1Range::parse(&cells)?;

        let mut data = self.data.write().await;
        let spreadsheet = data.spreadsheet_mut(spreadsheet_id)?;
        let tab = match &tab_title {
            Some(title) => {
                spreadsheet
                    .tab_mut(title)
                    .ok_or_else(|| SheetsError::TabNotFound {
                        spreadsheet_id: spreadsheet_id.to_string(),
                        tab: title.clone(),
                    })?
            }
            None => spreadsheet
                .tabs
                .first_mut()
                .ok_or_else(|| SheetsError::InvalidRange(range.to_string()))?,
        };

        for (r, row) in values.iter().enumerate() {
            let row_index = origin.first_row + r;
            if tab.rows.len() <= row_index {
                tab.rows.resize_with(row_index + 1, Vec::new);
            }
            let target = &mut tab.rows[row_index];
            for (c, cell) in row.iter().enumerate() {
                let col_index = origin.first_col + c;
                if target.len() <= col_index {
                    target.resize(col_index + 1, Value::Null);
                }
                target[col_index] = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::Text(cell.clone())
                };
            }
        }

        self.persist(&data).await
    }
}
