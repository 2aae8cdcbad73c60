//! HTTP API server.
//!
//! Exposes search, record lookup and sync triggers as a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/search?q=<text>` | Transcript search; always 200 |
//! | `GET`  | `/videos/{id}` | One video record, store first then archive |
//! | `POST` | `/sync` | Incremental sync into the live store |
//! | `POST` | `/sync/snapshot` | Sync into the per-year archive files |
//!
//! Both sync routes accept an optional `?min_year=` and answer with
//! `{ "success": true, "data": { "videos": {...} } }`, or
//! `{ "success": false, "error": "..." }` and status 500 when the run
//! aborts. Sync requests are serialized; search never waits on them.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use caption_harness_core::models::{SearchResponse, VideoCollection};
use caption_harness_core::progress::NoProgress;

use crate::config::Config;
use crate::get::find_video;
use crate::ingest::{sync_snapshot, sync_store};
use crate::search::search_transcripts;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    /// Held for the duration of a sync run.
    sync_lock: Arc<Mutex<()>>,
}

/// Starts the HTTP server on `[server].bind`.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("Caption server listening on http://{}", listener.local_addr()?);
    serve_with_listener(config, listener).await
}

/// Serve on an already-bound listener (lets tests bind port 0).
pub async fn serve_with_listener(
    config: &Config,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "serving");
    axum::serve(listener, router(config)).await?;
    Ok(())
}

/// Build the router with all routes and middleware attached.
pub fn router(config: &Config) -> Router {
    let state = AppState {
        config: Arc::new(config.clone()),
        sync_lock: Arc::new(Mutex::new(())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/search", get(handle_search))
        .route("/videos/{id}", get(handle_get_video))
        .route("/sync", post(handle_sync_store))
        .route("/sync/snapshot", post(handle_sync_snapshot))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: format!("{:#}", err),
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    Json(search_transcripts(&state.config, &params.q).await)
}

async fn handle_get_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    match find_video(&state.config, &id).await.map_err(internal)? {
        Some((record, _)) => Ok(Json(record).into_response()),
        None => Err(not_found(format!("video not found: {}", id))),
    }
}

#[derive(Deserialize, Default)]
struct SyncParams {
    #[serde(default)]
    min_year: Option<i32>,
}

/// Body of both sync routes.
#[derive(Serialize)]
struct SyncResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<VideoCollection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn sync_response(label: &str, result: anyhow::Result<VideoCollection>) -> Response {
    match result {
        Ok(videos) => Json(SyncResponse {
            success: true,
            data: Some(videos),
            error: None,
        })
        .into_response(),
        Err(e) => {
            let message = format!("{:#}", e);
            error!(sync_target = label, error = %message, "sync request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SyncResponse {
                    success: false,
                    data: None,
                    error: Some(message),
                }),
            )
                .into_response()
        }
    }
}

async fn handle_sync_store(
    State(state): State<AppState>,
    Query(params): Query<SyncParams>,
) -> Response {
    let _guard = state.sync_lock.lock().await;
    let result = sync_store(&state.config, params.min_year, &NoProgress)
        .await
        .map(|outcome| outcome.videos);
    sync_response("store", result)
}

async fn handle_sync_snapshot(
    State(state): State<AppState>,
    Query(params): Query<SyncParams>,
) -> Response {
    let _guard = state.sync_lock.lock().await;
    let result = sync_snapshot(&state.config, params.min_year, &NoProgress)
        .await
        .map(|outcome| outcome.videos);
    sync_response("snapshot", result)
}
