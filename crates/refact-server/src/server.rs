//! Axum router and the service-level endpoints

use crate::error::{ApiError, ApiResult};
use crate::projects;
use crate::state::{AppState, SharedState};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use refact_agent::ToolSet;
use refact_core::RefactError;
use refact_llm::{ChatCompletion, ChatRequest, Model};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub const SERVICE_NAME: &str = "refact";

/// Build the router over `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/caps", get(caps))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/projects/create", post(projects::create_project))
        .route("/v1/projects/:id/agent", post(projects::run_agent))
        .route("/v1/projects/:id/chat", post(projects::chat))
        .route("/v1/projects/:id/tree", get(projects::tree))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Serve until the process is stopped
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /health - never touches the upstream API
async fn health(State(app): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "features": app.config.features(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /v1/caps
async fn caps(State(app): State<SharedState>) -> Json<Value> {
    let models: Vec<Value> = Model::ALL
        .iter()
        .map(|m| json!({ "name": m.to_string(), "id": m.api_name() }))
        .collect();

    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "provider": app.config.provider.to_string(),
        "models": models,
        "default_model": app.config.model,
        "max_tokens": app.config.max_tokens,
        "agent_tools": ToolSet::descriptions(),
    }))
}

/// POST /v1/chat/completions
async fn chat_completions(
    State(app): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatCompletion>> {
    if request.messages.is_empty() {
        return Err(ApiError(RefactError::InvalidRequest(
            "messages must not be empty".to_string(),
        )));
    }
    let completion = app.gateway().chat(request).await?;
    Ok(Json(completion))
}
