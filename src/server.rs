//! HTTP search server.
//!
//! Exposes the search pipeline as a small JSON API. Sessions map one-to-one
//! onto [`crate::context::ContextEngine`] instances held in a
//! [`SessionRegistry`]: a search without a `session_id` starts a new session
//! and returns its id so the client can keep the conversation going.
//!
//! # Endpoints
//!
//! | Method   | Path              | Description |
//! |----------|-------------------|-------------|
//! | `POST`   | `/search`         | Context-aware search (`{query, session_id?}`) |
//! | `POST`   | `/sessions`       | Create a session explicitly |
//! | `DELETE` | `/sessions/{id}`  | End a session, discarding its history |
//! | `GET`    | `/health`         | Health check (version + index size) |
//!
//! # Lazy initialization
//!
//! The index and embedding provider are loaded on the first search request,
//! guarded by a `tokio::sync::OnceCell` so concurrent first requests cannot
//! double-initialize. `/health` reports `index_size: 0` until then.
//!
//! # Error Contract
//!
//! All error responses share one envelope:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `embeddings_disabled` (400),
//! `not_found` (404), `internal` (500).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::index::FlatIndex;
use crate::models::SearchHit;
use crate::rerank::rerank;
use crate::search::hydrate;
use crate::session::SessionRegistry;

/// Everything a search needs that is loaded once: the database pool, the
/// in-memory index, and the embedding provider.
struct SearchService {
    pool: sqlx::SqlitePool,
    index: FlatIndex,
    provider: Box<dyn EmbeddingProvider>,
}

impl SearchService {
    async fn init(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        let index = FlatIndex::load(&pool, config.corpus.dims).await?;
        let provider = embedding::create_provider(&config.embedding)?;

        println!("Loaded index with {} papers", index.len());

        Ok(Self {
            pool,
            index,
            provider,
        })
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    service: Arc<OnceCell<SearchService>>,
    sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Get the search service, initializing it on first use.
    async fn service(&self) -> Result<&SearchService, AppError> {
        self.service
            .get_or_try_init(|| SearchService::init(&self.config))
            .await
            .map_err(|e| internal(format!("failed to initialize search service: {}", e)))
    }
}

/// Starts the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let state = AppState {
        sessions: Arc::new(SessionRegistry::new(config.context.clone())),
        config: Arc::new(config.clone()),
        service: Arc::new(OnceCell::new()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/search", post(handle_search))
        .route("/sessions", post(handle_create_session))
        .route("/sessions/{id}", delete(handle_delete_session))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("Search server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn embeddings_disabled(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "embeddings_disabled".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
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

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    /// Number of papers in the loaded index; `0` before the first search
    /// triggers lazy initialization.
    index_size: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let index_size = state.service.get().map(|s| s.index.len()).unwrap_or(0);
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        index_size,
    })
}

// ============ POST /sessions ============

#[derive(Serialize)]
struct SessionResponse {
    session_id: Uuid,
}

async fn handle_create_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(SessionResponse {
        session_id: state.sessions.create(),
    })
}

// ============ DELETE /sessions/{id} ============

async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    if state.sessions.remove(id) {
        Ok(Json(serde_json::json!({ "ok": true })))
    } else {
        Err(not_found(format!("no session with id {}", id)))
    }
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    /// Reuse an existing session's context. Omitted → a new session is
    /// created and returned in the response.
    #[serde(default)]
    session_id: Option<Uuid>,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    session_id: Uuid,
    /// Ordered by the contextual view; each hit also carries `base_score`
    /// for consumers that want pure relevance.
    results: Vec<SearchHit>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if request.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    if !state.config.embedding.is_enabled() {
        return Err(embeddings_disabled(
            "Search requires embeddings. Set [embedding] provider in config.",
        ));
    }

    let session_id = match request.session_id {
        Some(id) => {
            if state.sessions.get(id).is_none() {
                return Err(not_found(format!("no session with id {}", id)));
            }
            id
        }
        None => state.sessions.create(),
    };

    let service = state.service().await?;

    let query_vec = embedding::embed_query(
        service.provider.as_ref(),
        &state.config.embedding,
        &request.query,
    )
    .await
    .map_err(|e| internal(format!("embedding failed: {}", e)))?;

    // Update this session's history and take the context snapshot under the
    // session lock; all the vector arithmetic inside is synchronous.
    let engine = state
        .sessions
        .get(session_id)
        .ok_or_else(|| not_found(format!("no session with id {}", session_id)))?;
    let context = {
        let mut engine = engine.lock().expect("session engine lock poisoned");
        engine
            .add_query(query_vec.clone())
            .map_err(|e| bad_request(e.to_string()))?;
        engine.context_vector()
    };

    let top_k = state.config.retrieval.top_k;
    let candidate_k = top_k * state.config.retrieval.candidate_multiplier;

    let candidates = service
        .index
        .search(&query_vec, candidate_k)
        .map_err(|e| bad_request(e.to_string()))?;

    let ranked =
        rerank(&candidates, context.as_deref()).map_err(|e| internal(e.to_string()))?;
    let mut top = ranked.by_context();
    top.truncate(top_k);

    let results = hydrate(&service.pool, &top)
        .await
        .map_err(|e| internal(e.to_string()))?;

    Ok(Json(SearchResponse {
        query: request.query,
        session_id,
        results,
    }))
}
