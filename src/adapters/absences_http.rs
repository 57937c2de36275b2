//! Absences HTTP Server.
//!
//! Serves the cached absence snapshot to consumers. Every `/absences`
//! request goes through the refresh cache, so a stale snapshot triggers at
//! most one pipeline run no matter how many requests arrive together.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::domain::models::ServerConfig;
use crate::services::{CacheLookup, CacheStatus, RefreshError, SnapshotCache};

/// Shared state for the Absences HTTP server.
pub struct AbsencesState {
    pub cache: Arc<SnapshotCache>,
}

/// Absences HTTP Server.
pub struct AbsencesHttpServer {
    state: Arc<AbsencesState>,
    config: ServerConfig,
}

impl AbsencesHttpServer {
    pub fn new(cache: Arc<SnapshotCache>, config: ServerConfig) -> Self {
        Self {
            state: Arc::new(AbsencesState { cache }),
            config,
        }
    }

    /// Build the router with all endpoints.
    pub fn build_router(&self) -> Router {
        router(self.state.clone())
    }

    /// Start the server with a shutdown signal.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let router = self.build_router();

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "absences HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

/// Router over an existing cache, without binding a socket.
pub fn router(state: Arc<AbsencesState>) -> Router {
    Router::new()
        .route("/absences", get(get_absences))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Error response structure.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl ErrorResponse {
    fn new(status: StatusCode, error: impl Into<String>, detail: Option<String>) -> Response {
        (
            status,
            Json(Self {
                error: error.into(),
                detail,
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(flatten)]
    cache: CacheStatus,
}

async fn get_absences(State(state): State<Arc<AbsencesState>>) -> Response {
    match state.cache.get_snapshot().await {
        Ok(CacheLookup::Ready(snapshot)) => Json(snapshot.as_ref().clone()).into_response(),
        Ok(CacheLookup::Unavailable(reason)) => {
            ErrorResponse::new(StatusCode::SERVICE_UNAVAILABLE, reason.as_str(), None)
        }
        Err(err) => {
            let detail = match &err {
                RefreshError::Pipeline(pipeline) => format!("{}: {pipeline}", pipeline.kind()),
                RefreshError::Aborted(_) => err.to_string(),
            };
            ErrorResponse::new(StatusCode::BAD_GATEWAY, "refresh failed", Some(detail))
        }
    }
}

async fn health_check(State(state): State<Arc<AbsencesState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        cache: state.cache.status().await,
    })
}
