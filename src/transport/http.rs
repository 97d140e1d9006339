//! Forwarding proxy for chat completions
//!
//! `POST /api/chat` relays `{model, messages}` to the upstream chat endpoint
//! with the caller's `Authorization` header. Success bodies pass through
//! untouched; failures come back as `{"error": "<message>"}` with the
//! upstream status, so browser clients get one error shape.

use crate::config::Config;
use crate::llm::extract_error_message;
use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared proxy state
struct ProxyState {
    client: reqwest::Client,
    chat_url: String,
}

/// Body accepted from clients; only these two fields are forwarded
#[derive(Debug, Deserialize, Serialize)]
struct ForwardRequest {
    model: String,
    messages: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Build the proxy router forwarding to `chat_url`
pub fn proxy_router(chat_url: impl Into<String>) -> Router {
    let state = Arc::new(ProxyState {
        client: reqwest::Client::new(),
        chat_url: chat_url.into(),
    });

    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(forward_chat))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the proxy until the process is stopped
pub async fn run_proxy_server(host: &str, port: u16, config: &Config) -> Result<()> {
    let app = proxy_router(config.upstream.chat_url.clone());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!(
        "Proxy listening on {}, forwarding to {}",
        addr,
        config.upstream.chat_url
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn forward_chat(
    State(state): State<Arc<ProxyState>>,
    headers: HeaderMap,
    Json(body): Json<ForwardRequest>,
) -> Response {
    let Some(auth) = headers.get(header::AUTHORIZATION).cloned() else {
        return error_response(StatusCode::UNAUTHORIZED, "Missing Authorization header");
    };

    tracing::debug!(target: "llm", model = %body.model, "Forwarding chat request");

    let upstream = match state
        .client
        .post(&state.chat_url)
        .header(header::AUTHORIZATION, auth)
        .header(header::CONTENT_TYPE, "application/json")
        .json(&body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Upstream unreachable: {}", e);
            return error_response(StatusCode::BAD_GATEWAY, e.to_string());
        }
    };

    let status = upstream.status();
    let text = match upstream.text().await {
        Ok(text) => text,
        Err(e) => return error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    };

    if !status.is_success() {
        let message = extract_error_message(status, &text);
        tracing::debug!(%status, "Upstream rejected request: {}", message);
        return error_response(status, message);
    }

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => error_response(
            StatusCode::BAD_GATEWAY,
            format!("Malformed upstream response: {}", e),
        ),
    }
}
