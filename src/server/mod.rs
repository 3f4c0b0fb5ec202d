//! NDJSON request/response loop over a [`Session`].
//!
//! Requests are handled one at a time in arrival order, matching the
//! one-action-at-a-time model of the pipeline. A failed request never ends
//! the loop; only end of input or an I/O error does.

pub mod protocol;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::pipeline::{PipelineResult, Session};
use protocol::{
    codes, methods, CreateDestinationParams, ErrorInfo, ExportParams, ListSpreadsheetsResult,
    ListTabsParams, ListTabsResult, LoadParams, QueryParams, RequestEnvelope, ResponseEnvelope,
    SelectDestinationParams, SelectDestinationResult, SelectSourceParams,
};

/// Result type for the serve loop.
pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to read request: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("failed to write response: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("failed to serialize response: {0}")]
    SerializeFailed(#[source] serde_json::Error),
}

/// Serve requests from `reader` until end of input. Returns the number of
/// requests answered.
pub async fn serve<R, W>(session: &Session, reader: R, mut writer: W) -> ServerResult<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut answered = 0;

    while let Some(line) = lines.next_line().await.map_err(ServerError::ReadFailed)? {
        let Some(response) = handle_line(session, &line).await else {
            continue;
        };
        let out = serde_json::to_string(&response).map_err(ServerError::SerializeFailed)? + "\n";
        writer
            .write_all(out.as_bytes())
            .await
            .map_err(ServerError::WriteFailed)?;
        writer.flush().await.map_err(ServerError::WriteFailed)?;
        answered += 1;
    }

    info!(requests = answered, "input closed, serve loop finished");
    Ok(answered)
}

/// Handle one input line. Blank lines produce no response.
pub async fn handle_line(session: &Session, line: &str) -> Option<ResponseEnvelope> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<RequestEnvelope>(line) {
        Ok(request) => Some(dispatch(session, request).await),
        Err(e) => {
            warn!(error = %e, "malformed request");
            Some(ResponseEnvelope::err(
                "",
                ErrorInfo::new(codes::INVALID_REQUEST, format!("malformed request: {}", e)),
            ))
        }
    }
}

/// Route a request to the matching session operation.
pub async fn dispatch(session: &Session, request: RequestEnvelope) -> ResponseEnvelope {
    let RequestEnvelope { id, method, params } = request;
    debug!(id = %id, method = %method, "request");

    let outcome = match method.as_str() {
        methods::LIST_SPREADSHEETS => run(session.list_spreadsheets().await.map(|spreadsheets| {
            ListSpreadsheetsResult { spreadsheets }
        })),
        methods::LIST_TABS => match parse::<ListTabsParams>(params) {
            Ok(p) => run(
                session
                    .list_tabs(&p.spreadsheet_id)
                    .await
                    .map(|tabs| ListTabsResult { tabs }),
            ),
            Err(e) => Err(e),
        },
        methods::SELECT_SOURCE => match parse::<SelectSourceParams>(params) {
            Ok(p) => run(
                session
                    .select_source(&p.spreadsheet_id, &p.tab, p.range.as_deref())
                    .await,
            ),
            Err(e) => Err(e),
        },
        methods::LOAD => match parse::<LoadParams>(params) {
            Ok(p) => run(load(session, p).await),
            Err(e) => Err(e),
        },
        methods::QUERY => match parse::<QueryParams>(params) {
            Ok(p) => run(session.query(&p.sql).await),
            Err(e) => Err(e),
        },
        methods::EXPORT => match parse::<ExportParams>(params) {
            Ok(p) => run(
                session
                    .query_and_export(&p.sql, p.spreadsheet_id.as_deref())
                    .await,
            ),
            Err(e) => Err(e),
        },
        methods::CREATE_DESTINATION => match parse::<CreateDestinationParams>(params) {
            Ok(p) => run(session.create_destination(p.title.as_deref()).await),
            Err(e) => Err(e),
        },
        methods::SELECT_DESTINATION => match parse::<SelectDestinationParams>(params) {
            Ok(p) => {
                session.select_destination(&p.spreadsheet_id).await;
                run(Ok(SelectDestinationResult {
                    spreadsheet_id: p.spreadsheet_id,
                }))
            }
            Err(e) => Err(e),
        },
        other => Err(ErrorInfo::new(
            codes::METHOD_NOT_FOUND,
            format!("unknown method: {}", other),
        )),
    };

    match outcome {
        Ok(result) => ResponseEnvelope::ok(id, result),
        Err(error) => ResponseEnvelope::err(id, error),
    }
}

async fn load(
    session: &Session,
    params: LoadParams,
) -> PipelineResult<crate::pipeline::LoadReport> {
    if let (Some(spreadsheet_id), Some(tab)) = (&params.spreadsheet_id, &params.tab) {
        let range = session
            .select_source(spreadsheet_id, tab, params.range.as_deref())
            .await?;
        return session.load(&range).await;
    }
    session.load_selected().await
}

/// Missing params are treated as an empty object.
fn parse<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, ErrorInfo> {
    let params = if params.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params)
        .map_err(|e| ErrorInfo::new(codes::INVALID_PARAMS, format!("invalid params: {}", e)))
}

fn run<T: Serialize>(result: PipelineResult<T>) -> Result<serde_json::Value, ErrorInfo> {
    let value = result.map_err(|e| ErrorInfo::from(&e))?;
    serde_json::to_value(value)
        .map_err(|e| ErrorInfo::new(codes::INTERNAL_ERROR, format!("failed to encode result: {}", e)))
}
