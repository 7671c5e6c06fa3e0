//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/search_sql` | Run the search pipeline for `{"query": "..."}` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Response contract
//!
//! ```json
//! {
//!   "answer": "Markdown text",
//!   "results": [{ "Nombre": "...", "URL": "...", "Categoría": null, "Descripción": "..." }],
//!   "status": { "keywords": "model", "lookup": "found", "answer": "generated" }
//! }
//! ```
//!
//! A missing, malformed or blank query gets `400 {"answer": "Consulta vacía."}`.
//! Every response carries headers that disable caching.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::catalog::sqlite::SqliteCatalog;
use crate::config::Config;
use crate::db;
use crate::llm::AzureChatClient;
use crate::models::ResourceRecord;
use crate::pipeline::{SearchOutcome, SearchPipeline, StageStatus, EMPTY_QUERY_ANSWER};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<SearchPipeline>,
}

/// Starts the HTTP server with the production collaborators.
///
/// Opens the catalog pool, builds the Azure chat client from
/// `AZURE_OPENAI_API_KEY`, and serves on `[server].bind` until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let catalog = Arc::new(SqliteCatalog::new(pool, &config.db.table));
    let model = Arc::new(AzureChatClient::from_env(&config.llm)?);
    let pipeline = Arc::new(SearchPipeline::new(config, model, catalog)?);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, deployment = %config.llm.deployment, "link search server listening");

    axum::serve(listener, router(pipeline)).await?;

    Ok(())
}

/// Build the router around an already-assembled pipeline.
///
/// Exposed so tests and embedding binaries can serve with their own
/// [`ChatModel`](crate::llm::ChatModel) and [`Catalog`](crate::catalog::Catalog).
pub fn router(pipeline: Arc<SearchPipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search_sql", post(handle_search))
        .route("/health", get(handle_health))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .layer(cors)
        .with_state(AppState { pipeline })
}

// ============ GET /health ============

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

// ============ POST /search_sql ============

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    answer: String,
    results: Vec<ResourceRecord>,
    status: StageStatus,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            answer: outcome.answer,
            results: outcome.records,
            status: outcome.status,
        }
    }
}

#[derive(Serialize)]
struct EmptyQueryResponse {
    answer: &'static str,
}

fn empty_query() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(EmptyQueryResponse {
            answer: EMPTY_QUERY_ANSWER,
        }),
    )
        .into_response()
}

/// Handler for `POST /search_sql`.
///
/// Rejects blank input before any component runs; otherwise always answers
/// `200`, degrading the answer text when a stage fails.
async fn handle_search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Response {
    let query = match body {
        Ok(Json(SearchRequest { query: Some(q) })) if !q.trim().is_empty() => q,
        Ok(_) => {
            tracing::info!("empty query rejected");
            return empty_query();
        }
        Err(rejection) => {
            tracing::info!(error = %rejection.body_text(), "unreadable request body rejected");
            return empty_query();
        }
    };

    tracing::info!(query = %query, "query received");
    let outcome = state.pipeline.run(&query).await;

    Json(SearchResponse::from(outcome)).into_response()
}
