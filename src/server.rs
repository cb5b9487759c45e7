use crate::error::Result;
use crate::types::RepositoryRecord;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Shared in-memory repository table for the development backend
#[derive(Clone, Default)]
pub struct BackendState {
    repositories: Arc<RwLock<Vec<RepositoryRecord>>>,
}

impl BackendState {
    pub fn new(repositories: Vec<RepositoryRecord>) -> Self {
        Self {
            repositories: Arc::new(RwLock::new(repositories)),
        }
    }

    /// Load seed data from a JSON array of repositories
    pub async fn from_seed_file(path: &std::path::Path) -> Result<Self> {
        let contents = tokio::fs::read(path).await?;
        let repositories: Vec<RepositoryRecord> = serde_json::from_slice(&contents)?;
        info!("Loaded {} seed repositories from {}", repositories.len(), path.display());
        Ok(Self::new(repositories))
    }

    pub async fn repositories(&self) -> Vec<RepositoryRecord> {
        self.repositories.read().await.clone()
    }
}

/// Response for errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub repositories: usize,
}

/// Create the backend router
pub fn create_router(state: BackendState) -> Router {
    Router::new()
        .route("/repositories", get(list_repositories))
        .route("/repositories/:id/like", post(like_repository))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the backend on an already-bound listener until the task is dropped
pub async fn serve(listener: TcpListener, state: BackendState) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Repository backend listening on http://{}", addr);

    axum::serve(listener, create_router(state)).await?;

    Ok(())
}

async fn list_repositories(State(state): State<BackendState>) -> impl IntoResponse {
    let repositories = state.repositories.read().await;
    debug!("Listing {} repositories", repositories.len());
    (StatusCode::OK, Json(repositories.clone()))
}

async fn like_repository(
    State(state): State<BackendState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let mut repositories = state.repositories.write().await;

    match repositories.iter_mut().find(|repo| repo.id.to_string() == id) {
        Some(repository) => {
            repository.likes = repository.likes.saturating_add(1);
            debug!(%id, likes = repository.likes, "Repository liked");
            (StatusCode::OK, Json(repository.clone())).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Repository {} not found", id),
            }),
        ).into_response(),
    }
}

async fn health_check(State(state): State<BackendState>) -> impl IntoResponse {
    let repositories = state.repositories.read().await.len();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        repositories,
    })
}
