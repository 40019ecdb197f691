use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use pubsearch_core::persist::DataPaths;
use pubsearch_core::{DocId, SearchEngine, SearchHit, SearchOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const NO_DATA_MESSAGE: &str = "No data or index found. Run the crawler and build the index first.";

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub k: Option<usize>,
}

fn clamp_k(k: Option<usize>) -> usize { k.unwrap_or(10).clamp(1, 100) }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Clone)]
pub struct AppState {
    pub paths: DataPaths,
    /// Swapped whole on reload; queries clone the inner `Arc` and never block a reload.
    pub engine: Arc<RwLock<Arc<SearchEngine>>>,
}

impl AppState {
    pub fn open(paths: DataPaths) -> Result<Self> {
        let engine = SearchEngine::open(&paths)
            .with_context(|| format!("loading search artifacts from {}", paths.root.display()))?;
        Ok(Self { paths, engine: Arc::new(RwLock::new(Arc::new(engine))) })
    }

    pub fn engine(&self) -> Arc<SearchEngine> { self.engine.read().clone() }
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

pub fn build_app(data_dir: String) -> Result<Router> {
    let state = AppState::open(DataPaths::new(&data_dir))?;

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/publication/:doc_id", get(publication_handler))
        .route("/reload", post(reload_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let start = std::time::Instant::now();
    let query = match params.query.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return error(StatusCode::BAD_REQUEST, "Query parameter is required"),
    };
    let engine = state.engine();
    let hits = match engine.search(&query) {
        SearchOutcome::NoData => return error(StatusCode::SERVICE_UNAVAILABLE, NO_DATA_MESSAGE),
        SearchOutcome::Hits(hits) => hits,
    };
    let total_hits = hits.len();
    let results = hits.into_iter().take(clamp_k(params.k)).collect();
    tracing::debug!(%query, total_hits, "search");
    Json(SearchResponse { query, took_ms: start.elapsed().as_millis(), total_hits, results }).into_response()
}

pub async fn publication_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Response {
    let engine = state.engine();
    match engine.publication(doc_id) {
        Some(p) => Json(p.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "not found"),
    }
}

/// Re-read corpus and index from disk after a new crawl/build.
pub async fn reload_handler(State(state): State<AppState>) -> Response {
    let paths = state.paths.clone();
    // file reads, JSON parsing and hashing stay off the async workers
    let opened = match tokio::task::spawn_blocking(move || SearchEngine::open(&paths)).await {
        Ok(opened) => opened,
        Err(e) => {
            tracing::error!(error = %e, "reload task failed");
            return error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };
    match opened {
        Ok(engine) => {
            let body = serde_json::json!({ "num_docs": engine.num_docs(), "num_terms": engine.num_terms() });
            *state.engine.write() = Arc::new(engine);
            tracing::info!(%body, "search artifacts reloaded");
            Json(body).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "reload failed, keeping previous artifacts");
            error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::clamp_k;

    #[test]
    fn k_is_clamped() {
        assert_eq!(clamp_k(None), 10);
        assert_eq!(clamp_k(Some(0)), 1);
        assert_eq!(clamp_k(Some(500)), 100);
        assert_eq!(clamp_k(Some(7)), 7);
    }
}
