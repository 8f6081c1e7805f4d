//! HTTP Server
//!
//! Read-only views for operators and lobbies:
//! - `GET /health`
//! - `GET /sessions` (room summaries)
//! - `GET /sessions/:id` (full snapshot)

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use match_runtime::RuntimeError;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::ArenaContext;

/// HTTP Server
pub struct HttpServer {
    context: Arc<ArenaContext>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(context: Arc<ArenaContext>) -> Self {
        Self { context }
    }

    /// Create the Axum router
    pub fn router(self) -> Router {
        // CORS layer to allow browser clients
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

        Router::new()
            .route("/health", get(handle_health))
            .route("/sessions", get(handle_sessions))
            .route("/sessions/:id", get(handle_session))
            .layer(cors)
            .with_state(self.context)
    }

    /// Run the server
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP server listening on {}", addr);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn handle_health(State(context): State<Arc<ArenaContext>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "sessions": context.registry.len(),
    }))
}

async fn handle_sessions(State(context): State<Arc<ArenaContext>>) -> impl IntoResponse {
    Json(context.registry.summaries())
}

async fn handle_session(
    State(context): State<Arc<ArenaContext>>,
    Path(id): Path<String>,
) -> Response {
    match context.registry.snapshot(&id).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => {
            let status = match e {
                RuntimeError::UnknownSession(_) | RuntimeError::RoomClosed(_) => StatusCode::NOT_FOUND,
                RuntimeError::Match(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let body = json!({ "code": e.code(), "message": e.to_string() });
            (status, Json(body)).into_response()
        }
    }
}
