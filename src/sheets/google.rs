//! Google Sheets v4 / Drive v3 backend.
//!
//! Every call authenticates through the configured [`CredentialProvider`] and
//! sends the token as a bearer header. There is no retry or backoff; a failed
//! call surfaces immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{
    CellRange, CredentialProvider, SheetDestination, SheetSource, SheetsError, SheetsResult,
    SpreadsheetInfo, TabInfo,
};
use crate::value::Value;

/// Default Sheets API base URL.
pub const SHEETS_API: &str = "https://sheets.googleapis.com/v4";

/// Default Drive API base URL.
pub const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";

const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Default request timeout (30 seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// REST client for Google Sheets and Drive.
pub struct GoogleSheets {
    http: Client,
    credentials: Arc<dyn CredentialProvider>,
    sheets_api: Url,
    drive_api: Url,
    value_input_option: String,
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    #[serde(rename = "sheetId", default)]
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(rename = "spreadsheetId", default)]
    spreadsheet_id: String,
    #[serde(default)]
    properties: Option<SpreadsheetProperties>,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchUpdateReply>,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateReply {
    #[serde(rename = "addSheet")]
    add_sheet: Option<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl GoogleSheets {
    /// Create a client against the public Google endpoints.
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> SheetsResult<Self> {
        Self::with_endpoints(
            credentials,
            SHEETS_API,
            DRIVE_API,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a client against custom endpoints (proxies, emulators).
    pub fn with_endpoints(
        credentials: Arc<dyn CredentialProvider>,
        sheets_api: &str,
        drive_api: &str,
        timeout: Duration,
    ) -> SheetsResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            credentials,
            sheets_api: parse_base(sheets_api)?,
            drive_api: parse_base(drive_api)?,
            value_input_option: "USER_ENTERED".to_string(),
        })
    }

    /// How written strings are interpreted (`USER_ENTERED` or `RAW`).
    pub fn value_input_option(mut self, option: impl Into<String>) -> Self {
        self.value_input_option = option.into();
        self
    }

    /// `{sheets}/spreadsheets/{id}/values/{range}`
    pub fn values_url(&self, spreadsheet_id: &str, range: &str) -> SheetsResult<Url> {
        join_segments(
            &self.sheets_api,
            &["spreadsheets", spreadsheet_id, "values", range],
        )
    }

    /// `{sheets}/spreadsheets/{id}` (or the collection when `id` is `None`).
    pub fn spreadsheet_url(&self, spreadsheet_id: Option<&str>) -> SheetsResult<Url> {
        match spreadsheet_id {
            Some(id) => join_segments(&self.sheets_api, &["spreadsheets", id]),
            None => join_segments(&self.sheets_api, &["spreadsheets"]),
        }
    }

    /// `{sheets}/spreadsheets/{id}:batchUpdate`
    pub fn batch_update_url(&self, spreadsheet_id: &str) -> SheetsResult<Url> {
        let segment = format!("{}:batchUpdate", spreadsheet_id);
        join_segments(&self.sheets_api, &["spreadsheets", &segment])
    }

    async fn request(&self, method: Method, url: Url) -> SheetsResult<RequestBuilder> {
        let credential = self.credentials.authenticate().await?;
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(credential.access_token()))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> SheetsResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(SheetsError::api(status.as_u16(), message));
        }
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| SheetsError::UnexpectedResponse(format!("{}: {}", e, body)))
    }
}

fn parse_base(base: &str) -> SheetsResult<Url> {
    Url::parse(base.trim_end_matches('/'))
        .map_err(|e| SheetsError::UnexpectedResponse(format!("invalid API base '{}': {}", base, e)))
}

/// Append percent-encoded path segments to a base URL.
fn join_segments(base: &Url, segments: &[&str]) -> SheetsResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SheetsError::UnexpectedResponse(format!("cannot-be-a-base URL: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl SheetSource for GoogleSheets {
    async fn get_range(&self, range: &CellRange) -> SheetsResult<Vec<Vec<Value>>> {
        let mut url = self.values_url(&range.spreadsheet_id, &range.a1_notation())?;
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE")
            .append_pair("dateTimeRenderOption", "SERIAL_NUMBER");

        let response: ValueRangeResponse = self.send(self.request(Method::GET, url).await?).await?;
        Ok(response
            .values
            .into_iter()
            .map(|row| row.into_iter().map(Value::from).collect())
            .collect())
    }

    async fn list_spreadsheets(&self) -> SheetsResult<Vec<SpreadsheetInfo>> {
        let mut spreadsheets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = join_segments(&self.drive_api, &["files"])?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair(
                        "q",
                        &format!("mimeType='{}' and trashed = false", SPREADSHEET_MIME),
                    )
                    .append_pair("fields", "nextPageToken, files(id, name)")
                    .append_pair("orderBy", "name");
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: DriveFileList = self.send(self.request(Method::GET, url).await?).await?;
            spreadsheets.extend(page.files.into_iter().map(|f| SpreadsheetInfo {
                id: f.id,
                name: f.name,
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(spreadsheets)
    }

    async fn list_tabs(&self, spreadsheet_id: &str) -> SheetsResult<Vec<TabInfo>> {
        let mut url = self.spreadsheet_url(Some(spreadsheet_id))?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");

        let response: SpreadsheetResponse =
            self.send(self.request(Method::GET, url).await?).await?;
        let mut tabs: Vec<TabInfo> = response
            .sheets
            .into_iter()
            .map(|s| TabInfo {
                id: s.properties.sheet_id,
                title: s.properties.title,
            })
            .collect();
        tabs.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(tabs)
    }
}

#[async_trait]
impl SheetDestination for GoogleSheets {
    async fn create_spreadsheet(&self, title: &str) -> SheetsResult<SpreadsheetInfo> {
        let url = self.spreadsheet_url(None)?;
        let body = json!({ "properties": { "title": title } });

        let response: SpreadsheetResponse = self
            .send(self.request(Method::POST, url).await?.json(&body))
            .await?;
        if response.spreadsheet_id.is_empty() {
            return Err(SheetsError::UnexpectedResponse(
                "create returned no spreadsheetId".to_string(),
            ));
        }
        Ok(SpreadsheetInfo {
            id: response.spreadsheet_id,
            name: response
                .properties
                .map(|p| p.title)
                .unwrap_or_else(|| title.to_string()),
        })
    }

    async fn add_tab(&self, spreadsheet_id: &str, title: &str) -> SheetsResult<TabInfo> {
        let url = self.batch_update_url(spreadsheet_id)?;
        let body = json!({
            "requests": [ { "addSheet": { "properties": { "title": title } } } ]
        });

        let response: BatchUpdateResponse = self
            .send(self.request(Method::POST, url).await?.json(&body))
            .await?;
        let created = response
            .replies
            .into_iter()
            .find_map(|r| r.add_sheet)
            .ok_or_else(|| {
                SheetsError::UnexpectedResponse("batchUpdate returned no addSheet reply".to_string())
            })?;
        Ok(TabInfo {
            id: created.properties.sheet_id,
            title: created.properties.title,
        })
    }

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> SheetsResult<()> {
        let mut url = self.values_url(spreadsheet_id, range)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", &self.value_input_option);
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });

        let _: serde_json::Value = self
            .send(self.request(Method::PUT, url).await?.json(&body))
            .await?;
        Ok(())
    }
}
