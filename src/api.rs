//! HTTP surface for the credit literacy bot
//!
//! Webhook verification and delivery for the chat platform, plus a JSON chat
//! endpoint for local testing and frontends.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::conversation::{user_tag, ConversationEngine};
use crate::whatsapp::{MessageSender, WebhookPayload};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatReply {
    pub reply: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<ConversationEngine>,
    pub sender: Arc<dyn MessageSender>,
    pub verify_token: Arc<str>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let active_sessions = match state.engine.active_sessions().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Could not count sessions");
            None
        }
    };

    let status = if active_sessions.is_some() {
        "healthy"
    } else {
        "degraded"
    };

    Json(serde_json::json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "active_sessions": active_sessions,
    }))
}

/// =============================
/// Webhook Endpoints
/// =============================

async fn verify_webhook(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let mode_ok = params
        .get("hub.mode")
        .map_or(true, |mode| mode == "subscribe");
    let token_ok = params
        .get("hub.verify_token")
        .is_some_and(|token| token.as_str() == &*state.verify_token);

    match params.get("hub.challenge") {
        Some(challenge) if mode_ok && token_ok => {
            info!("Webhook verified");
            (StatusCode::OK, challenge.clone())
        }
        _ => {
            warn!("Webhook verification rejected");
            (StatusCode::FORBIDDEN, "Forbidden".to_string())
        }
    }
}

/// Always acknowledges with 200 so the platform does not retry bad payloads.
async fn receive_webhook(State(state): State<ApiState>, body: Bytes) -> StatusCode {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(error = %e, "Ignoring malformed webhook payload");
            return StatusCode::OK;
        }
    };

    for (from, text) in payload.text_messages() {
        let reply = state.engine.handle_message(&from, &text).await;
        if let Err(e) = state.sender.send(&from, &reply).await {
            warn!(user = %user_tag(&from), error = %e, "Reply delivery failed");
        }
    }

    StatusCode::OK
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.user_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("user_id is required".into())),
        );
    }

    let reply = state.engine.handle_message(req.user_id.trim(), &req.message).await;

    (StatusCode::OK, Json(ApiResponse::success(ChatReply { reply })))
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/api/chat", post(chat_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(state: ApiState, port: u16) -> crate::Result<()> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("Webhook server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
