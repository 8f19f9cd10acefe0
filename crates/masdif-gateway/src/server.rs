// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use masdif_config::model::ServerConfig;
use masdif_core::MasdifError;
use masdif_pipeline::{HealthChecker, TurnOrchestrator};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{AuthConfig, admin_auth};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub health: Arc<HealthChecker>,
    pub auth: AuthConfig,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Builds the full route table.
///
/// Listing routes sit behind the admin bearer guard; everything else is public.
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route(
            "/conversations",
            post(handlers::create_conversation),
        )
        .route(
            "/conversations/{id}",
            get(handlers::get_conversation)
                .patch(handlers::update_conversation)
                .put(handlers::update_conversation)
                .delete(handlers::delete_conversation),
        )
        .route("/health", get(handlers::get_health))
        .route("/info", get(handlers::get_info))
        .route("/version", get(handlers::get_version))
        .route("/attachments/{file}", get(handlers::get_attachment))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/conversations", get(handlers::list_conversations))
        .route(
            "/conversations/{id}/excerpts",
            get(handlers::conversation_excerpts),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            admin_auth,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds the listener and serves until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), MasdifError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MasdifError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| MasdifError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("Gateway stopped");
    Ok(())
}
