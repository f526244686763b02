// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use bookline_core::{BooklineError, ConversationStore};
use bookline_engine::LifecycleEngine;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The conversation lifecycle engine.
    pub engine: Arc<LifecycleEngine>,
    /// Store handle for read endpoints (listing).
    pub store: Arc<dyn ConversationStore>,
    /// Webhook signing secret; `None` skips verification (documented bypass).
    pub signing_secret: Option<String>,
    /// Outbound message cap, enforced before the engine is invoked.
    pub max_message_length: usize,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

/// Build the gateway router.
///
/// Routes:
/// - `POST /webhooks/booking` -- signed booking webhook
/// - `POST /webhooks/sms`     -- inbound SMS notifications (single or batch)
/// - `POST /admin/replies`    -- manual operator reply
/// - `GET  /admin/conversations` -- filtered, paginated listing
/// - `GET  /health`           -- liveness
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/booking", post(handlers::post_booking))
        .route("/webhooks/sms", post(handlers::post_inbound_sms))
        .route("/admin/replies", post(handlers::post_admin_reply))
        .route("/admin/conversations", get(handlers::get_conversations))
        .route("/health", get(handlers::get_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP server on `host:port`, serving until the task
/// is aborted.
pub async fn start_server(host: &str, port: u16, state: AppState) -> Result<(), BooklineError> {
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BooklineError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| BooklineError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
