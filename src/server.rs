//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/support/health` | Health probe scoped to the support API |
//! | `GET`  | `/support/ping` | Model and knowledge-directory status |
//! | `GET`  | `/support/categories` | Playbook categories in table order |
//! | `POST` | `/support/diagnose` | Classify an error and return its playbook |
//! | `POST` | `/support/diagnose/with-summary` | As above, plus an assistant summary |
//! | `POST` | `/admin/rebuild-vector-store` | Rebuild the document index from the seeds |
//! | `GET`  | `/admin/search?q=&top_k=` | Search the document index |
//! | `GET`  | `/debug/vector-store` | Report on the persisted index file |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "error_code is required" } }
//! ```
//!
//! Error codes: `bad_request` (400), `rebuild_failed` (500), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser clients can
//! call the API directly.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use support_triage_core::models::SearchHit;

use crate::app::App;
use crate::config::Config;
use crate::diagnose::{DiagnoseRequest, DiagnoseResponse};
use crate::vector_store::StoreInfo;

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let app = App::from_config(config)?;
    let bind_addr = config.server.bind.clone();

    // Warm the index so the first search does not pay for the load.
    let index = app.index.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = index.get_or_load() {
            tracing::warn!(error = %format!("{:#}", e), "vector store warm-up failed");
        }
    });

    let router = build_router(app);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "support triage API listening");
    axum::serve(listener, router).await?;

    Ok(())
}

pub fn build_router(app: App) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/support/health", get(handle_support_health))
        .route("/support/ping", get(handle_ping))
        .route("/support/categories", get(handle_categories))
        .route("/support/diagnose", post(handle_diagnose))
        .route("/support/diagnose/with-summary", post(handle_diagnose_with_summary))
        .route("/admin/rebuild-vector-store", post(handle_rebuild))
        .route("/admin/search", get(handle_search))
        .route("/debug/vector-store", get(handle_store_info))
        .layer(cors)
        .with_state(app)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn rebuild_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "rebuild_failed".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ Health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_support_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Serialize)]
struct PingResponse {
    ok: bool,
    model: String,
    has_openai: bool,
    knowledge_dir: Option<String>,
}

async fn handle_ping(State(app): State<App>) -> Json<PingResponse> {
    tracing::debug!("ping received");
    let knowledge_dir = app.config.playbook.dir.as_ref().map(|dir| {
        dir.canonicalize()
            .unwrap_or_else(|_| dir.clone())
            .display()
            .to_string()
    });
    Json(PingResponse {
        ok: true,
        model: app.config.summarizer.effective_model(),
        has_openai: std::env::var("OPENAI_API_KEY")
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false),
        knowledge_dir,
    })
}

// ============ Support ============

#[derive(Serialize)]
struct CategoriesResponse {
    categories: Vec<String>,
}

async fn handle_categories(State(app): State<App>) -> Json<CategoriesResponse> {
    let categories = app
        .diagnostician
        .playbook()
        .categories()
        .into_iter()
        .map(str::to_string)
        .collect();
    Json(CategoriesResponse { categories })
}

async fn diagnose(
    app: &App,
    payload: Result<Json<DiagnoseRequest>, JsonRejection>,
    with_summary: bool,
) -> Result<Json<DiagnoseResponse>, AppError> {
    // Undecodable bodies share the JSON error contract instead of axum's
    // plain-text rejection.
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    app.diagnostician
        .diagnose(&req, with_summary)
        .await
        .map(Json)
        .map_err(|e| bad_request(e.to_string()))
}

async fn handle_diagnose(
    State(app): State<App>,
    payload: Result<Json<DiagnoseRequest>, JsonRejection>,
) -> Result<Json<DiagnoseResponse>, AppError> {
    diagnose(&app, payload, false).await
}

async fn handle_diagnose_with_summary(
    State(app): State<App>,
    payload: Result<Json<DiagnoseRequest>, JsonRejection>,
) -> Result<Json<DiagnoseResponse>, AppError> {
    diagnose(&app, payload, true).await
}

// ============ Admin ============

#[derive(Serialize)]
struct RebuildResponse {
    status: String,
    documents: usize,
}

async fn handle_rebuild(State(app): State<App>) -> Result<Json<RebuildResponse>, AppError> {
    let index = app.index.clone();
    let documents = tokio::task::spawn_blocking(move || index.rebuild())
        .await
        .map_err(|e| internal(e.to_string()))?
        .map_err(|e| rebuild_failed(format!("{:#}", e)))?;

    Ok(Json(RebuildResponse {
        status: "rebuilt".to_string(),
        documents,
    }))
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

async fn handle_search(
    State(app): State<App>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let top_k = params
        .top_k
        .unwrap_or(app.config.retrieval.default_top_k);
    let index = app.index.clone();
    let results = tokio::task::spawn_blocking(move || index.search(&params.q, top_k))
        .await
        .map_err(|e| internal(e.to_string()))?;

    Ok(Json(SearchResponse { results }))
}

// ============ Debug ============

async fn handle_store_info(State(app): State<App>) -> Result<Json<StoreInfo>, AppError> {
    let index = app.index.clone();
    let info = tokio::task::spawn_blocking(move || index.store_info())
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(info))
}
