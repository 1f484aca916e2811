// SPDX-License-Identifier: Apache-2.0

//! Route table, shared state, and request handlers.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{FromRequest, Multipart, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use ufxray_core::{
    AppConfig, BoundedLedger, FALLBACK_SVG, FeedAggregator, ImageProxy, KevCatalog, LedgerSummary,
    ProxyOutcome, ScanRunner, XrayError, interpret_file_scan, interpret_log_scan,
    interpret_url_scan, system_clock,
};

use crate::error::ApiError;

/// Shared handles behind every route.
#[derive(Clone)]
pub struct AppState {
    news: Arc<FeedAggregator>,
    kev: Arc<KevCatalog>,
    proxy: Arc<ImageProxy>,
    ledger: Arc<BoundedLedger>,
    scanner: Arc<ScanRunner>,
    news_default_limit: usize,
    kev_default_limit: usize,
    ledger_default_limit: usize,
    started_at: Instant,
}

impl AppState {
    /// Build all collaborators from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any HTTP client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, XrayError> {
        let clock = system_clock();
        Ok(Self {
            news: Arc::new(FeedAggregator::new(&config.news, Arc::clone(&clock))?),
            kev: Arc::new(KevCatalog::new(&config.kev, Arc::clone(&clock))?),
            proxy: Arc::new(ImageProxy::new(&config.proxy)?),
            ledger: Arc::new(BoundedLedger::new(config.ledger.capacity)),
            scanner: Arc::new(ScanRunner::new(&config.scan)),
            news_default_limit: config.news.default_limit,
            kev_default_limit: config.kev.default_limit,
            ledger_default_limit: config.ledger.default_limit,
            started_at: Instant::now(),
        })
    }
}

/// Assemble the full route table over `state`.
///
/// CORS is fully permissive; the gateway fronts a browser UI served from a
/// different origin.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/api/news", get(news))
        .route("/api/news-image", get(news_image))
        .route("/api/vuln/known", get(vuln_known))
        .route("/api/vuln/found", get(vuln_found))
        .route("/api/vuln/summary", get(vuln_summary))
        .route("/api/scan-url", post(scan_url))
        .route("/api/scan-file", post(scan_file))
        .route("/api/scan-log", post(scan_log))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn is_truthy(flag: Option<&str>) -> bool {
    matches!(flag, Some("1" | "true"))
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "ufxray",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
    }))
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime": state.started_at.elapsed().as_secs(),
        "timestamp": Utc::now(),
    }))
}

#[derive(Deserialize)]
struct NewsQuery {
    limit: Option<usize>,
    nocache: Option<String>,
}

async fn news(State(state): State<AppState>, Query(query): Query<NewsQuery>) -> Json<Value> {
    let limit = query.limit.unwrap_or(state.news_default_limit);
    let items = state
        .news
        .get(limit, is_truthy(query.nocache.as_deref()))
        .await;
    Json(json!({ "items": items }))
}

#[derive(Deserialize)]
struct ImageQuery {
    src: Option<String>,
}

async fn news_image(State(state): State<AppState>, Query(query): Query<ImageQuery>) -> Response {
    let Some(src) = query.src.filter(|s| !s.trim().is_empty()) else {
        return ApiError::bad_request("missing src query parameter").into_response();
    };

    match state.proxy.serve(&src).await {
        ProxyOutcome::Image {
            content_type,
            response,
        } => {
            let builder = Response::builder()
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CACHE_CONTROL, "public, max-age=86400");
            match builder.body(Body::from_stream(response.bytes_stream())) {
                Ok(relayed) => relayed,
                Err(_) => fallback_image(),
            }
        }
        ProxyOutcome::RedirectLoop => (
            StatusCode::LOOP_DETECTED,
            Json(json!({ "message": "redirect loop detected" })),
        )
            .into_response(),
        ProxyOutcome::Fallback => fallback_image(),
    }
}

fn fallback_image() -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        FALLBACK_SVG,
    )
        .into_response()
}

#[derive(Deserialize)]
struct KevQuery {
    limit: Option<usize>,
    q: Option<String>,
    nocache: Option<String>,
}

async fn vuln_known(State(state): State<AppState>, Query(query): Query<KevQuery>) -> Response {
    let page = state
        .kev
        .get(
            query.limit.unwrap_or(state.kev_default_limit),
            query.q.as_deref().unwrap_or(""),
            is_truthy(query.nocache.as_deref()),
        )
        .await;
    Json(page).into_response()
}

#[derive(Deserialize)]
struct FoundQuery {
    limit: Option<usize>,
}

async fn vuln_found(State(state): State<AppState>, Query(query): Query<FoundQuery>) -> Json<Value> {
    let items = state
        .ledger
        .list(query.limit.unwrap_or(state.ledger_default_limit));
    let total = state.ledger.summarize().total_found;
    Json(json!({ "items": items, "total": total }))
}

async fn vuln_summary(State(state): State<AppState>) -> Json<LedgerSummary> {
    Json(state.ledger.summarize())
}

#[derive(Deserialize)]
struct ScanUrlRequest {
    url: Option<String>,
}

async fn scan_url(
    State(state): State<AppState>,
    Json(body): Json<ScanUrlRequest>,
) -> Result<Json<Value>, ApiError> {
    let url = body
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing url"))?;
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(XrayError::InvalidUrl {
            url: url.to_string(),
        }
        .into());
    }

    let verdict = state.scanner.scan_url(url).await?;
    if let Some(draft) = interpret_url_scan(&verdict) {
        state.ledger.append(draft);
    }
    Ok(Json(verdict))
}

async fn scan_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().unwrap_or("upload.bin").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;
        if data.is_empty() {
            return Err(ApiError::bad_request("uploaded file is empty"));
        }

        let upload = spool_to_disk(&data)?;
        let verdict = state.scanner.scan_file(upload.path(), &original_name).await?;
        if let Some(draft) = interpret_file_scan(&verdict) {
            state.ledger.append(draft);
        }
        return Ok(Json(verdict));
    }

    Err(ApiError::bad_request("missing file field"))
}

#[derive(Deserialize)]
struct ScanLogRequest {
    text: Option<String>,
}

const MAX_LOG_BYTES: usize = 5 * 1024 * 1024;

/// Accepts either a multipart `file` upload or a JSON `{ "text": ... }`
/// body, keyed off the request content type.
async fn scan_log(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let data = if is_multipart {
        log_from_multipart(request).await?
    } else {
        log_from_json(request).await?
    };
    if data.is_empty() {
        return Err(ApiError::bad_request("missing log text"));
    }

    let excerpt = spool_to_disk(&data)?;
    let verdict = state.scanner.scan_log(excerpt.path()).await?;
    if let Some(draft) = interpret_log_scan(&verdict) {
        state.ledger.append(draft);
    }
    Ok(Json(verdict))
}

async fn log_from_multipart(request: Request) -> Result<Vec<u8>, ApiError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;
        return Ok(data.to_vec());
    }
    Err(ApiError::bad_request("missing file field"))
}

async fn log_from_json(request: Request) -> Result<Vec<u8>, ApiError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_LOG_BYTES)
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to read body: {e}")))?;
    let body: ScanLogRequest = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::bad_request(format!("malformed JSON body: {e}")))?;
    Ok(body
        .text
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
        .into_bytes())
}

/// Write scan input to a temp file the analyzer scripts can read. The file
/// is removed when the handle drops.
fn spool_to_disk(data: &[u8]) -> Result<tempfile::NamedTempFile, ApiError> {
    let mut file = tempfile::NamedTempFile::new()
        .map_err(|e| ApiError::internal(format!("failed to create temp file: {e}")))?;
    file.write_all(data)
        .and_then(|()| file.flush())
        .map_err(|e| ApiError::internal(format!("failed to spool upload: {e}")))?;
    Ok(file)
}
