//! Event handlers for the plotting page.
//!
//! Each handler is a pure function from the event payload and the current
//! [`SessionState`] to the next state and a [`RenderInstruction`]. The async
//! wrappers load the session, apply the handler and store the result.

use shared::{
    domain::{AxisSelection, Phase, SessionId, Table, TableGeneration, UploadedFile},
    error::{ApiError, ErrorCode},
    protocol::{ChartArtifact, ChartPanel, PreviewPage, RenderInstruction, SubmitRequest},
};
use storage::{SessionState, Storage};
use tabular::{decode, paginate, parse, render, type_tag, ChartError};
use tracing::{debug, info, warn};

mod panels;

pub use panels::{FileHeader, RAW_EXCERPT_CHARS};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub preview_page_size: usize,
}

/// An uploaded file after decoding and parsing, before it touches any session.
#[derive(Debug)]
pub struct StagedFile {
    pub header: FileHeader,
    pub outcome: Result<Table, ApiError>,
}

/// Decodes and parses one file. Failures are captured, never raised.
pub fn stage_file(file: &UploadedFile) -> StagedFile {
    debug!(
        filename = %file.filename,
        media = type_tag(&file.contents).unwrap_or("unknown"),
        "staging upload"
    );
    let header = FileHeader::new(&file.contents, &file.filename, file.last_modified);
    let outcome = decode(&file.contents)
        .map_err(|e| ApiError::new(ErrorCode::MalformedPayload, e.to_string()))
        .and_then(|bytes| {
            parse(&bytes, &file.filename).map_err(|e| ApiError::new(e.code(), e.to_string()))
        });
    StagedFile { header, outcome }
}

/// Upload event. Every file gets its own panel; each table that parsed is
/// written to the session slot in order, so the last one wins.
pub fn on_upload(
    state: &SessionState,
    files: Vec<StagedFile>,
    page_size: usize,
) -> (SessionState, RenderInstruction) {
    if files.is_empty() {
        return (state.clone(), RenderInstruction::NoUpdate);
    }

    let mut next = state.clone();
    next.phase = Phase::FileStaged;
    let mut any_table = false;
    let mut rendered = Vec::with_capacity(files.len());
    for StagedFile { header, outcome } in files {
        match outcome {
            Ok(table) => {
                info!(
                    filename = %header.filename,
                    columns = table.columns().len(),
                    rows = table.row_count(),
                    "upload parsed"
                );
                let preview_generation = next.generation().next();
                rendered.push(panels::table_panel(
                    header,
                    &table,
                    preview_generation,
                    page_size,
                ));
                next.put(table);
                any_table = true;
            }
            Err(error) => {
                warn!(
                    filename = %header.filename,
                    code = ?error.code,
                    detail = %error.message,
                    "upload rejected"
                );
                rendered.push(panels::error_panel(header, error));
            }
        }
    }
    next.phase = if any_table {
        Phase::TableReady
    } else {
        Phase::UploadFailed
    };

    (next, RenderInstruction::ReplaceUploadPanels { panels: rendered })
}

/// Submit click. Does nothing until the button has actually been clicked or
/// while the session has no table; otherwise draws the selected columns.
pub fn on_submit(state: &SessionState, request: &SubmitRequest) -> (SessionState, RenderInstruction) {
    if request.n_clicks.is_none() {
        return (state.clone(), RenderInstruction::NoUpdate);
    }
    let Some(table) = state.get() else {
        return (state.clone(), RenderInstruction::NoUpdate);
    };

    let mut next = state.clone();
    next.selection = AxisSelection {
        x: request.x.clone(),
        y: request.y.clone(),
    };
    let chart = match chart_for(table, request, state.generation()) {
        Ok(artifact) => ChartPanel::Figure(artifact),
        Err(error) => {
            warn!(code = ?error.code, detail = %error.message, "chart not rendered");
            ChartPanel::Error(error)
        }
    };
    next.phase = Phase::ChartShown;

    (next, RenderInstruction::ReplaceChart { chart })
}

fn chart_for(
    table: &Table,
    request: &SubmitRequest,
    current: TableGeneration,
) -> Result<ChartArtifact, ApiError> {
    let x = request
        .x
        .as_deref()
        .ok_or_else(|| ApiError::new(ErrorCode::UnknownColumn, "no x column selected"))?;
    let y = request
        .y
        .as_deref()
        .ok_or_else(|| ApiError::new(ErrorCode::UnknownColumn, "no y column selected"))?;

    render(table, x, y).map_err(|error| match (error, request.generation) {
        (ChartError::UnknownColumn(column), Some(seen)) if seen != current => ApiError::new(
            ErrorCode::StaleSelection,
            format!("column '{column}' was selected from an earlier upload"),
        ),
        (error, _) => ApiError::new(error.code(), error.to_string()),
    })
}

pub async fn upload(
    ctx: &ApiContext,
    session: SessionId,
    files: Vec<UploadedFile>,
) -> Result<RenderInstruction, ApiError> {
    let staged =
        tokio::task::spawn_blocking(move || files.iter().map(stage_file).collect::<Vec<_>>())
            .await
            .map_err(|e| ApiError::new(ErrorCode::Internal, format!("upload worker failed: {e}")))?;
    let page_size = ctx.preview_page_size;
    Ok(ctx
        .storage
        .apply(session, |state| on_upload(state, staged, page_size))
        .await)
}

pub async fn submit(ctx: &ApiContext, session: SessionId, request: SubmitRequest) -> RenderInstruction {
    ctx.storage
        .apply(session, |state| on_submit(state, &request))
        .await
}

pub async fn preview(
    ctx: &ApiContext,
    session: SessionId,
    page: usize,
) -> Result<PreviewPage, ApiError> {
    let table = ctx
        .storage
        .table(session)
        .await
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "no table uploaded in this session"))?;
    Ok(paginate(&table, page, ctx.preview_page_size))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
