//! HTTP surface for Slack
//!
//! Every inbound request is verified, parsed, acknowledged right away, and
//! handled on its own task; Slack expects an answer within three seconds.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::handler::BotHandler;
use crate::platforms::{InboundEvent, PlatformError, SlackPlatform};

/// Server state
#[derive(Clone)]
pub struct AppState {
    pub slack: Arc<SlackPlatform>,
    pub handler: BotHandler,
}

impl AppState {
    pub fn new(slack: Arc<SlackPlatform>, handler: BotHandler) -> Self {
        Self { slack, handler }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/slack/events", post(events_handler))
        .route("/slack/interactions", post(interactions_handler))
        .route("/slack/commands", post(commands_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the future is dropped or the listener fails
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("K2SO bot listening on http://{}", addr);
    info!("  POST /slack/events        - Events API");
    info!("  POST /slack/interactions  - Menu selections");
    info!("  POST /slack/commands      - Slash command");
    info!("  GET  /health              - Health check");
    axum::serve(listener, router(state)).await
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": k2so_core::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn events_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(e) = verify(&state, &headers, &body) {
        return rejection(e);
    }
    if headers.contains_key("x-slack-retry-num") {
        debug!("Acknowledging Slack retry without reprocessing");
        return StatusCode::OK.into_response();
    }

    match state.slack.parse_event(&body) {
        Ok(InboundEvent::UrlVerification { challenge }) => {
            Json(json!({ "challenge": challenge })).into_response()
        }
        Ok(event) => dispatch(&state, event),
        Err(e) => rejection(e),
    }
}

async fn interactions_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = verify(&state, &headers, &body) {
        return rejection(e);
    }
    match state.slack.parse_interaction(&body) {
        Ok(event) => dispatch(&state, event),
        Err(e) => rejection(e),
    }
}

async fn commands_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = verify(&state, &headers, &body) {
        return rejection(e);
    }
    match state.slack.parse_slash_command(&body) {
        Ok(event) => dispatch(&state, event),
        Err(e) => rejection(e),
    }
}

fn verify(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), PlatformError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    match (header("x-slack-signature"), header("x-slack-request-timestamp")) {
        (Some(signature), Some(timestamp)) => state.slack.verify_request(body, signature, timestamp),
        _ => Err(PlatformError::InvalidSignature(
            "Missing Slack signature headers".to_string(),
        )),
    }
}

fn dispatch(state: &AppState, event: InboundEvent) -> Response {
    if event != InboundEvent::Ignored {
        let handler = state.handler.clone();
        tokio::spawn(async move { handler.handle_event(event).await });
    }
    StatusCode::OK.into_response()
}

fn rejection(error: PlatformError) -> Response {
    let status = match error {
        PlatformError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
        PlatformError::ParseError(_) => StatusCode::BAD_REQUEST,
        PlatformError::ApiError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(status = %status, error = %error, "Rejected Slack request");
    (status, error.to_string()).into_response()
}
