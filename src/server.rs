//! HTTP server: MCP streamable transport, REST search and directory admin API
//!
//! Engine, store and git work is blocking and runs on
//! `tokio::task::spawn_blocking`; handlers only shuttle JSON.

use anyhow::Result;
use axum::{
    Router,
    body::Bytes,
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, patch, post},
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::directories::DirectoryStore;
use crate::git;
use crate::ignore_file::{read_ignore_file, write_ignore_file};
use crate::mcp::McpHandler;
use crate::models::{Directory, SearchRequest, SearchResponse};
use crate::search::SearchEngine;

type ApiResult<T> = std::result::Result<T, (StatusCode, String)>;

/// Server state shared across requests
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub mcp: McpHandler,
    pub store: DirectoryStore,
    pub ignore_file: PathBuf,
}

impl AppState {
    pub fn new(engine: Arc<SearchEngine>, store: DirectoryStore, ignore_file: PathBuf) -> Self {
        Self {
            mcp: McpHandler::new(Arc::clone(&engine)),
            engine,
            store,
            ignore_file,
        }
    }
}

// Request body for POST /api/directories
#[derive(Debug, Deserialize)]
pub struct AddDirectoryRequest {
    #[serde(default)]
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub language: String,
    pub role: String,
}

// Request body for PATCH /api/directories/:id/enabled
#[derive(Debug, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

// Request body for PATCH /api/directories/:id/git
#[derive(Debug, Deserialize)]
pub struct SetGitIntervalRequest {
    pub git_auto_update_interval_sec: i64,
}

/// Build the router with all endpoints
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/mcp/search_internal_codebase", post(handle_search))
        .route("/api/directories", get(list_directories).post(add_directory))
        .route("/api/directories/:id", delete(delete_directory))
        .route("/api/directories/:id/enabled", patch(set_directory_enabled))
        .route("/api/directories/:id/git", patch(set_directory_git_interval))
        .route("/api/directories/:id/git/pull", post(pull_directory))
        .route("/api/ignore-file", get(get_ignore_file).put(put_ignore_file))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Bind `addr` and serve until the process is stopped
pub async fn run_server(state: AppState, addr: &str) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task failed: {}", e)))?
}

fn internal_error(context: &str, e: anyhow::Error) -> (StatusCode, String) {
    log::error!("{}: {:#}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{}: {:#}", context, e))
}

fn not_found(id: i64) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("Directory {} not found", id))
}

// POST /mcp
async fn handle_mcp(State(state): State<Arc<AppState>>, body: String) -> ApiResult<Response> {
    let handler = state.mcp.clone();
    let response = run_blocking(move || Ok(handler.handle_message(&body))).await?;

    Ok(match response {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    })
}

// POST /mcp/search_internal_codebase
async fn handle_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    let engine = Arc::clone(&state.engine);

    run_blocking(move || {
        engine
            .search(&request)
            .map(|matches| Json(SearchResponse { matches }))
            .map_err(|e| {
                log::error!("Search failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "search failed".to_string())
            })
    })
    .await
}

// GET /api/directories
async fn list_directories(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Directory>>> {
    let store = state.store.clone();
    run_blocking(move || {
        store
            .list()
            .map(Json)
            .map_err(|e| internal_error("Failed to list directories", e))
    })
    .await
}

// POST /api/directories
async fn add_directory(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddDirectoryRequest>,
) -> ApiResult<(StatusCode, Json<Directory>)> {
    let store = state.store.clone();
    run_blocking(move || {
        store
            .add(&request.name, &request.path, &request.language, &request.role)
            .map(|dir| (StatusCode::CREATED, Json(dir)))
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("{:#}", e)))
    })
    .await
}

// DELETE /api/directories/:id
async fn delete_directory(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<i64>,
) -> ApiResult<StatusCode> {
    let store = state.store.clone();
    run_blocking(move || match store.delete(id) {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(not_found(id)),
        Err(e) => Err(internal_error("Failed to delete directory", e)),
    })
    .await
}

// PATCH /api/directories/:id/enabled
async fn set_directory_enabled(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<i64>,
    Json(request): Json<SetEnabledRequest>,
) -> ApiResult<Json<Directory>> {
    let store = state.store.clone();
    run_blocking(move || {
        match store.set_enabled(id, request.enabled) {
            Ok(true) => {}
            Ok(false) => return Err(not_found(id)),
            Err(e) => return Err(internal_error("Failed to update directory", e)),
        }
        fetch_directory(&store, id)
    })
    .await
}

// PATCH /api/directories/:id/git
async fn set_directory_git_interval(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<i64>,
    Json(request): Json<SetGitIntervalRequest>,
) -> ApiResult<Json<Directory>> {
    if request.git_auto_update_interval_sec < 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "git_auto_update_interval_sec must be >= 0".to_string(),
        ));
    }

    let store = state.store.clone();
    run_blocking(move || {
        match store.set_git_interval(id, request.git_auto_update_interval_sec) {
            Ok(true) => {}
            Ok(false) => return Err(not_found(id)),
            Err(e) => return Err(internal_error("Failed to update auto-pull interval", e)),
        }
        fetch_directory(&store, id)
    })
    .await
}

// POST /api/directories/:id/git/pull
async fn pull_directory(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let store = state.store.clone();
    run_blocking(move || {
        let Json(dir) = fetch_directory(&store, id)?;
        if !git::is_git_repo(&dir.path) {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("{} is not a git repository", dir.path),
            ));
        }

        let output = git::pull(&dir.path).map_err(|e| internal_error("git pull failed", e))?;
        if let Err(e) = store.mark_pulled(id, chrono::Utc::now()) {
            log::warn!("Failed to record pull time for {}: {:#}", dir.path, e);
        }
        Ok(Json(json!({ "ok": true, "output": output })))
    })
    .await
}

fn fetch_directory(store: &DirectoryStore, id: i64) -> ApiResult<Json<Directory>> {
    match store.get(id) {
        Ok(Some(dir)) => Ok(Json(dir)),
        Ok(None) => Err(not_found(id)),
        Err(e) => Err(internal_error("Failed to load directory", e)),
    }
}

// GET /api/ignore-file
async fn get_ignore_file(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let path = state.ignore_file.clone();
    let data = run_blocking(move || {
        read_ignore_file(&path).map_err(|e| internal_error("Failed to read ignore file", e))
    })
    .await?;

    Ok((
        [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        data,
    )
        .into_response())
}

// PUT /api/ignore-file
async fn put_ignore_file(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<StatusCode> {
    let path = state.ignore_file.clone();
    run_blocking(move || {
        write_ignore_file(&path, &body)
            .map(|_| StatusCode::NO_CONTENT)
            .map_err(|e| internal_error("Failed to write ignore file", e))
    })
    .await
}

// GET /health
async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "codex-mcp is running")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<AppState>) {
        let temp = TempDir::new().unwrap();
        let store = DirectoryStore::open(temp.path().join("codex-mcp.db")).unwrap();
        let ignore_file = temp.path().join("codex-ignore");
        let engine = SearchEngine::new(Arc::new(store.clone()))
            .with_ignore_file(&ignore_file)
            .with_accelerator(None);
        let state = AppState::new(Arc::new(engine), store, ignore_file);
        (temp, Arc::new(state))
    }

    #[tokio::test]
    async fn test_directory_lifecycle() {
        let (temp, state) = setup();
        let repo = temp.path().join("repo");
        fs::create_dir(&repo).unwrap();
        fs::write(repo.join("main.go"), "func Foo() {}\n").unwrap();

        let (status, Json(dir)) = add_directory(
            State(Arc::clone(&state)),
            Json(AddDirectoryRequest {
                name: String::new(),
                path: repo.to_string_lossy().into_owned(),
                language: "go".to_string(),
                role: "backend-business".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(dirs) = list_directories(State(Arc::clone(&state))).await.unwrap();
        assert_eq!(dirs.len(), 1);

        let Json(found) = handle_search(
            State(Arc::clone(&state)),
            Json(SearchRequest::new("foo")),
        )
        .await
        .unwrap();
        assert_eq!(found.matches.len(), 1);

        let Json(updated) = set_directory_enabled(
            State(Arc::clone(&state)),
            AxumPath(dir.id),
            Json(SetEnabledRequest { enabled: false }),
        )
        .await
        .unwrap();
        assert!(!updated.enabled);

        let Json(found) = handle_search(
            State(Arc::clone(&state)),
            Json(SearchRequest::new("foo")),
        )
        .await
        .unwrap();
        assert!(found.matches.is_empty());

        let status = delete_directory(State(Arc::clone(&state)), AxumPath(dir.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = delete_directory(State(state), AxumPath(dir.id)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_invalid_directory() {
        let (temp, state) = setup();
        let err = add_directory(
            State(state),
            Json(AddDirectoryRequest {
                name: "x".to_string(),
                path: temp.path().join("missing").to_string_lossy().into_owned(),
                language: String::new(),
                role: "backend-business".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_git_interval_validation() {
        let (_temp, state) = setup();
        let err = set_directory_git_interval(
            State(state),
            AxumPath(1),
            Json(SetGitIntervalRequest {
                git_auto_update_interval_sec: -5,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ignore_file_round_trip() {
        let (_temp, state) = setup();

        let status = put_ignore_file(State(Arc::clone(&state)), Bytes::from_static(b"dist/\n"))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(fs::read(&state.ignore_file).unwrap(), b"dist/\n");
    }

    #[tokio::test]
    async fn test_mcp_notification_is_accepted() {
        let (_temp, state) = setup();
        let response = handle_mcp(
            State(state),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#.to_string(),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
