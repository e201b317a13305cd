use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use super::error::ApiError;
use crate::constants::{CHAT_ROUTE, HEALTH_ROUTE, MODELS_ROUTE};
use crate::models::{list_models, ModelDescriptor};
use crate::provider::{ChatProvider, ChatRequest, ProviderRequest};
use crate::utils::DeepSearchError;

/// Shared state of the proxy route. Stateless across requests apart from
/// the provider client.
#[derive(Clone)]
pub struct ServerState {
    provider: Arc<dyn ChatProvider>,
    /// Name of the env var holding the provider credential
    api_key_env: String,
}

impl ServerState {
    pub fn new(provider: Arc<dyn ChatProvider>, api_key_env: impl Into<String>) -> Self {
        Self {
            provider,
            api_key_env: api_key_env.into(),
        }
    }

    /// Read the credential at request time; absence fails only this request
    fn api_key(&self) -> Result<String, DeepSearchError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                DeepSearchError::ConfigError(format!(
                    "API key is not configured (set {})",
                    self.api_key_env
                ))
            })
    }
}

/// Build the HTTP router
pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route(CHAT_ROUTE, post(chat))
        .route(MODELS_ROUTE, get(models))
        .route(HEALTH_ROUTE, get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `POST /api/chat`: stream provider fragments back as raw text
async fn chat(
    State(state): State<ServerState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) =
        payload.map_err(|e| DeepSearchError::InvalidRequest(e.body_text()))?;

    let api_key = state.api_key()?;
    let provider_request = ProviderRequest::from_messages(&request.model, &request.messages)?;

    info!(
        provider = state.provider.name(),
        requested = %request.model,
        resolved = %provider_request.model,
        messages = request.messages.len(),
        "chat request"
    );

    let fragments = state
        .provider
        .stream_chat(&api_key, provider_request)
        .await?;

    // No framing: the body is the plain concatenation of all fragments. A
    // mid-stream error aborts the body.
    let body = fragments.map(|item| {
        item.map(Bytes::from).map_err(|e| {
            error!("provider stream failed mid-response: {}", e);
            e
        })
    });

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}

/// `GET /api/models`
async fn models() -> Json<&'static [ModelDescriptor]> {
    Json(list_models())
}

async fn health() -> &'static str {
    "ok"
}
