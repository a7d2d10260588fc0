use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use lexis_core::overrides::suffix_boost;
use lexis_core::{Engine, EngineConfig, Error, SearchHit, StoredFields};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub field: Option<String>,
    pub k: Option<usize>,
    /// Multiply the score of documents whose path ends with this suffix (e.g. `.pdf`).
    pub boost_suffix: Option<String>,
    #[serde(default = "default_boost_factor")]
    pub boost_factor: f32,
    #[serde(default = "default_explain")]
    pub explain: bool,
}
fn default_boost_factor() -> f32 { 2.0 }
fn default_explain() -> bool { true }

const MAX_K: usize = 100;

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub field: String,
    pub took_s: f64,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: u32,
    pub stored: StoredFields,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

type ApiError = (StatusCode, String);

fn api_error(err: Error) -> ApiError {
    let status = match err {
        Error::QuerySyntax { .. } | Error::Schema { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

/// Router over the on-disk index named by `config`.
pub fn build_app(config: EngineConfig) -> Result<Router> {
    let engine = Engine::open(config)?;
    Ok(router(Arc::new(engine)))
}

pub fn router(engine: Arc<Engine>) -> Router {
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

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(AppState { engine })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let config = state.engine.config();
    let field = params.field.unwrap_or_else(|| config.default_field.clone());
    let k = params.k.unwrap_or(config.default_limit).min(MAX_K);

    let rescorer = params.boost_suffix.as_deref().map(|s| suffix_boost("path", s, params.boost_factor));
    let mut results = match &rescorer {
        Some(rescorer) => state.engine.search_with(&params.q, &field, k, Some(rescorer)),
        None => state.engine.search(&params.q, &field, k),
    }
    .map_err(api_error)?;

    if !params.explain {
        results.iter_mut().for_each(|hit| hit.explanation.clear());
    }

    Ok(Json(SearchResponse { query: params.q, field, took_s: start.elapsed().as_secs_f64(), results }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
) -> Result<Json<DocResponse>, ApiError> {
    match state.engine.stored(doc_id).map_err(api_error)? {
        Some(stored) => Ok(Json(DocResponse { doc_id, stored })),
        None => Err((StatusCode::NOT_FOUND, format!("document {doc_id} not found"))),
    }
}
