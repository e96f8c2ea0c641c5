//! Webhook HTTP server.

use std::sync::Arc;

use {
    axum::{
        Json, Router,
        extract::State,
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    },
    tracing::{info, warn},
};

use voxbi_channel::webhook::{WebhookEvent, normalize};

use crate::{state::AppState, turn::handle_inbound};

/// Build the router: the webhook endpoint and a liveness probe.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn start_gateway(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.server.bind, state.config.server.port);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Webhook deliveries are always acknowledged with 200 so the gateway does
/// not retry; the body carries the classified outcome.
async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WebhookEvent>, axum::extract::rejection::JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(event)) = payload else {
        warn!("rejecting malformed webhook payload");
        return (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "malformed_payload" })),
        );
    };

    let status = handle_inbound(&state, normalize(event)).await;
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": status.as_str() })),
    )
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
