use anyhow::Result;
use axum::extract::{Path as UrlPath, Query as UrlQuery, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use index_core::corpus::CorpusStore;
use index_core::engine::{engine_for, BuildStats};
use index_core::persist::{
    artifact_name, created_at_now, list_indexes, load_index, write_meta, MetaFile,
};
use index_core::score::{docs_with_all_terms, rank, score_documents};
use index_core::Query;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

type ApiError = (StatusCode, String);

/// Shared configuration only: which directories hold the corpus and the index
/// artifacts. Every request names its index explicitly; there is no
/// process-wide "currently selected index".
#[derive(Clone)]
pub struct AppState {
    pub corpus_dir: PathBuf,
    pub index_dir: PathBuf,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub index: String,
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 5 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
    pub exact_matches: Vec<String>,
    pub all_terms_docs: Vec<String>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc: String,
    pub score: u64,
}

#[derive(Deserialize)]
pub struct BuildRequest {
    pub datasets: Vec<String>,
    #[serde(default = "default_partitions")]
    pub partitions: usize,
    #[serde(default = "default_engine")]
    pub engine: String,
}
fn default_partitions() -> usize { 2 }
fn default_engine() -> String { "sequential".into() }

#[derive(Serialize)]
pub struct BuildResponse {
    pub index: String,
    pub stats: BuildStats,
}

pub fn build_app(corpus_dir: PathBuf, index_dir: PathBuf) -> Result<Router> {
    std::fs::create_dir_all(&index_dir)?;
    let state = AppState { corpus_dir, index_dir };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/datasets", get(datasets_handler))
        .route("/indexes", get(indexes_handler))
        .route("/index/:name", get(index_file_handler))
        .route("/build", post(build_handler))
        .route("/search", get(search_handler))
        .with_state(state)
        .layer(cors);
    Ok(app)
}

async fn datasets_handler(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let corpus = CorpusStore::new(&state.corpus_dir);
    let files = corpus
        .list()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(files))
}

async fn indexes_handler(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let names = list_indexes(&state.index_dir)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(names))
}

/// Reject anything that is not a bare filename before joining it under the
/// index directory.
fn artifact_path(state: &AppState, name: &str) -> Result<PathBuf, ApiError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
    {
        return Err((StatusCode::BAD_REQUEST, "invalid index name".into()));
    }
    Ok(state.index_dir.join(name))
}

async fn index_file_handler(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
) -> Result<String, ApiError> {
    let path = artifact_path(&state, &name)?;
    std::fs::read_to_string(&path)
        .map_err(|_| (StatusCode::NOT_FOUND, format!("no such index: {name}")))
}

async fn build_handler(
    State(state): State<AppState>,
    Json(req): Json<BuildRequest>,
) -> Result<Json<BuildResponse>, ApiError> {
    if req.datasets.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "no datasets selected".into()));
    }
    let corpus = CorpusStore::new(&state.corpus_dir);
    let inputs = corpus.paths_for(&req.datasets);
    if let Some(missing) = inputs.iter().find(|p| !p.is_file()) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("dataset not found: {}", missing.display()),
        ));
    }

    let engine_name = req.engine.clone();
    let partitions = req.partitions.max(1);
    let name = {
        let engine = engine_for(&engine_name, None)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        artifact_name(engine.name(), &inputs, partitions)
    };
    let output = state.index_dir.join(&name);

    let stats = tokio::task::spawn_blocking(move || -> anyhow::Result<BuildStats> {
        let engine = engine_for(&engine_name, None)?;
        let stats = engine.build(&inputs, &output, partitions)?;
        write_meta(
            &output,
            &MetaFile {
                version: 1,
                created_at: created_at_now(),
                engine: engine.name().to_string(),
                documents: stats.documents,
                empty_documents: stats.empty_documents,
                terms: stats.terms,
            },
        )?;
        Ok(stats)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    tracing::info!(index = %name, documents = stats.documents, "build complete");
    Ok(Json(BuildResponse { index: name, stats }))
}

async fn search_handler(
    State(state): State<AppState>,
    UrlQuery(params): UrlQuery<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let path = artifact_path(&state, &params.index)?;
    if !path.is_file() {
        return Err((StatusCode::NOT_FOUND, format!("no such index: {}", params.index)));
    }
    // The artifact is loaded per request: indexes are immutable once written,
    // so there is no cache invalidation to get wrong.
    let index =
        load_index(&path).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let query = Query::parse(&params.q);
    let corpus = CorpusStore::new(&state.corpus_dir);
    let (scores, exact_matches) = score_documents(&index, &query, &corpus);
    let all_terms_docs = docs_with_all_terms(&index, &query);

    let k = params.k.clamp(1, 100);
    let ranked = rank(&scores);
    let total_hits = ranked.len();
    let results = ranked
        .into_iter()
        .take(k)
        .map(|(doc, score)| SearchHit { doc, score })
        .collect();

    Ok(Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_hits,
        results,
        exact_matches,
        all_terms_docs: all_terms_docs.into_iter().collect(),
    }))
}
