use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

use crate::app::RelayConfig;
use crate::constants::{HTTP_REQUEST_TIMEOUT_SECS, RELAY_MAX_BODY_BYTES};
use crate::models::ErrorEnvelope;
use crate::utils::{log_error, log_info};

/// Client payload; everything except `messages` falls back to relay defaults
#[derive(Debug, Deserialize)]
struct RelayRequest {
    messages: Vec<Value>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    max_completion_tokens: Option<usize>,
}

/// Shared relay state
pub struct RelayState {
    client: reqwest::Client,
    config: RelayConfig,
    api_key: Option<String>,
}

impl RelayState {
    pub fn new(config: RelayConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            config,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Read the upstream key from the environment variable named in config
    pub fn from_env(config: RelayConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::new(config, api_key)
    }
}

/// Create the relay router with permissive CORS
pub fn create_router(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", post(relay_chat).options(preflight))
        .route("/v1/chat/completions", post(relay_chat).options(preflight))
        .route("/health", get(health))
        .with_state(Arc::new(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process is stopped
pub async fn serve(config: RelayConfig) -> Result<()> {
    let bind = config.bind.clone();
    let state = RelayState::from_env(config)?;
    if state.api_key.is_none() {
        log_error(
            "🔑",
            format!("${} is not set; every request will fail until it is", state.config.api_key_env),
        );
    }

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind relay to {}", bind))?;

    log_info("🛰️", format!("Relay listening on http://{}", bind));
    axum::serve(listener, app).await?;
    Ok(())
}

/// Empty success for OPTIONS requests that aren't full CORS preflights
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST / - forward a chat-completion request upstream with the secret key
async fn relay_chat(State(state): State<Arc<RelayState>>, body: Bytes) -> Response {
    if body.len() > RELAY_MAX_BODY_BYTES {
        return relay_error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large", "invalid_request_error");
    }

    let request: RelayRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return relay_error(
                StatusCode::BAD_REQUEST,
                &format!("Invalid request body: {}", e),
                "invalid_request_error",
            )
        }
    };

    let Some(api_key) = state.api_key.as_deref() else {
        return relay_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Relay is missing its upstream API key",
            "configuration_error",
        );
    };

    let upstream_body = json!({
        "model": request.model.unwrap_or_else(|| state.config.model.clone()),
        "messages": request.messages,
        "temperature": request.temperature.unwrap_or(state.config.temperature),
        "max_completion_tokens": request
            .max_completion_tokens
            .or(request.max_tokens)
            .unwrap_or(state.config.max_completion_tokens),
    });

    let upstream = state
        .client
        .post(&state.config.upstream_url)
        .header(header::AUTHORIZATION, format!("Bearer {}", api_key))
        .json(&upstream_body)
        .send()
        .await;

    let response = match upstream {
        Ok(response) => response,
        Err(e) => {
            error!("Upstream request failed: {}", e);
            return relay_error(
                StatusCode::BAD_GATEWAY,
                "Could not reach the completion provider",
                "api_error",
            );
        }
    };

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let payload = match response.bytes().await {
        Ok(payload) => payload,
        Err(e) => {
            error!("Reading upstream response failed: {}", e);
            return relay_error(StatusCode::BAD_GATEWAY, "Upstream response was cut off", "api_error");
        }
    };

    if status.is_success() {
        // Verbatim pass-through
        return (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            payload,
        )
            .into_response();
    }

    let upstream_error: Value = serde_json::from_slice(&payload).unwrap_or(Value::Null);
    error!("Upstream returned {}: {}", status, upstream_error);
    let message = upstream_error["error"]["message"]
        .as_str()
        .unwrap_or("OpenAI API request failed");
    let kind = upstream_error["error"]["type"].as_str().unwrap_or("api_error");
    relay_error(status, message, kind)
}

fn relay_error(status: StatusCode, message: &str, kind: &str) -> Response {
    (status, Json(ErrorEnvelope::new(message, kind))).into_response()
}
