use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use cinedex_core::record::parse_records;
use cinedex_core::schema::{OVERVIEW, TITLE};
use cinedex_core::{DocId, Engine, IndexStats, IngestReport, MovieHit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;

use error::{ApiError, ApiResult};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(default = "default_k")]
    pub k: usize,
    pub title_boost: Option<f32>,
    pub overview_boost: Option<f32>,
}
fn default_k() -> usize { 10 }

/// `{"success": true, "data": ...}`
#[derive(Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data })
    }
}

#[derive(Serialize)]
pub struct SearchHit {
    pub title: String,
    pub overview: String,
}

impl From<MovieHit> for SearchHit {
    fn from(hit: MovieHit) -> Self {
        Self { title: hit.title, overview: hit.overview }
    }
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: DocId,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

pub fn build_app(engine: Arc<Engine>, max_upload_bytes: usize) -> Router {
    let app_state = AppState { engine };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/import", post(import_handler))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

// CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
fn cors_layer() -> CorsLayer {
    match std::env::var("CORS_ALLOW_ORIGIN") {
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
    }
}

/// Accepts the first file part of a multipart upload and indexes its records as one batch.
pub async fn import_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<IngestReport>>)> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut payload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::BadRequest(e.body_text()))? {
        if field.file_name().is_none() {
            continue;
        }
        payload = Some(field.bytes().await.map_err(|e| ApiError::BadRequest(e.body_text()))?);
        break;
    }
    let payload = payload
        .filter(|bytes| !bytes.iter().all(u8::is_ascii_whitespace))
        .ok_or_else(|| ApiError::BadRequest("No file uploaded or file is empty".into()))?;

    let engine = Arc::clone(&state.engine);
    let report = tokio::task::spawn_blocking(move || -> cinedex_core::Result<IngestReport> {
        let records = parse_records(&payload)?;
        engine.ingest(&records)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok((StatusCode::CREATED, Envelope::ok(report)))
}

pub async fn search_handler(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<SearchHit>>>> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let q = params.q.unwrap_or_default();
    if q.is_empty() {
        return Err(ApiError::BadRequest("\"q\" param is empty".into()));
    }
    let k = params.k.clamp(1, MAX_K);

    let mut boosts = state.engine.boosts().clone();
    if let Some(b) = params.title_boost {
        boosts = boosts.with(TITLE, b)?;
    }
    if let Some(b) = params.overview_boost {
        boosts = boosts.with(OVERVIEW, b)?;
    }

    let start = std::time::Instant::now();
    let engine = Arc::clone(&state.engine);
    let hits = tokio::task::spawn_blocking(move || -> cinedex_core::Result<(String, Vec<MovieHit>)> {
        let hits = engine.query_with_boosts(&q, k, &boosts)?;
        Ok((q, hits))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;
    let (q, hits) = hits?;
    tracing::debug!(query = %q, k, hits = hits.len(), took_s = start.elapsed().as_secs_f64(), "search");
    Ok(Envelope::ok(hits.into_iter().map(SearchHit::from).collect()))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocId>,
) -> ApiResult<Json<Envelope<DocResponse>>> {
    let doc = state.engine.document(doc_id)?;
    let fields = doc
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
        .collect();
    Ok(Envelope::ok(DocResponse { doc_id, fields }))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<Envelope<IndexStats>> {
    Envelope::ok(state.engine.stats())
}
