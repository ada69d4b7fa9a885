use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use server_api::{preview, submit, upload, ApiContext};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{PreviewPage, RenderInstruction, SubmitRequest, UploadRequest},
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod session;

use app_state::AppState;
use config::{load_settings, parse_bind_addr};
use session::{resolve_session, spawn_session_sweeper};

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Debug, Deserialize)]
struct PreviewQuery {
    #[serde(default)]
    page: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings()?;
    let addr = parse_bind_addr(&settings.server_bind)?;
    let storage = Storage::new();
    let _sweeper = spawn_session_sweeper(storage.clone(), settings.session_idle());
    let state = AppState {
        api: ApiContext {
            storage,
            preview_page_size: settings.preview_page_size,
        },
    };
    let app = build_router(Arc::new(state), settings.max_upload_bytes);

    info!(
        %addr,
        max_upload_bytes = settings.max_upload_bytes,
        preview_page_size = settings.preview_page_size,
        session_idle_secs = settings.session_idle_secs,
        "excel plotter listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/upload", post(http_upload))
        .route("/graph", post(http_graph))
        .route("/preview", get(http_preview))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UploadRequest>,
) -> Result<(HeaderMap, Json<RenderInstruction>), (StatusCode, Json<ApiError>)> {
    let (session, set_cookie) = resolve_session(&headers);
    info!(%session, files = req.files.len(), "upload received");
    let rendered = upload(&state.api, session, req.files)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(e)))?;
    Ok((set_cookie, Json(rendered)))
}

async fn http_graph(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SubmitRequest>,
) -> (HeaderMap, Json<RenderInstruction>) {
    let (session, set_cookie) = resolve_session(&headers);
    let rendered = submit(&state.api, session, req).await;
    (set_cookie, Json(rendered))
}

async fn http_preview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<PreviewQuery>,
) -> Result<(HeaderMap, Json<PreviewPage>), (StatusCode, Json<ApiError>)> {
    let (session, set_cookie) = resolve_session(&headers);
    let page = preview(&state.api, session, q.page)
        .await
        .map_err(|e| {
            let status = match e.code {
                ErrorCode::NotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(e))
        })?;
    Ok((set_cookie, Json(page)))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
