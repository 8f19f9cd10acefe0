// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use masdif_core::Conversation;
use masdif_pipeline::{
    ConversationHistory, DeleteOutcome, HealthReport, InfoResponse, TurnRequest,
};

use crate::error::{ApiError, error_response};
use crate::server::GatewayState;

/// Response body for `POST /conversations`.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// POST /conversations
pub async fn create_conversation(
    State(state): State<GatewayState>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let conversation_id = state.orchestrator.create_conversation().await?;
    Ok(Json(CreatedResponse { conversation_id }))
}

/// GET /conversations (admin)
pub async fn list_conversations(
    State(state): State<GatewayState>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    Ok(Json(state.orchestrator.list_conversations().await?))
}

/// GET /conversations/{id}
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationHistory>, ApiError> {
    Ok(Json(state.orchestrator.conversation_history(&id).await?))
}

/// GET /conversations/{id}/excerpts (admin)
pub async fn conversation_excerpts(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let excerpts = state.orchestrator.excerpts(&id).await?;
    Ok(Json(excerpts).into_response())
}

/// PATCH|PUT /conversations/{id}
///
/// Runs one conversation turn and returns the reply array.
pub async fn update_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    body: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected turn body");
            return Err(ApiError(masdif_core::MasdifError::BadRequest(format!(
                "Invalid request body: {}",
                rejection.body_text()
            ))));
        }
    };
    let reply = state.orchestrator.handle_turn(&id, request).await?;
    Ok(Json(reply))
}

/// DELETE /conversations/{id}
pub async fn delete_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    match state.orchestrator.delete_conversation(&id).await? {
        DeleteOutcome::Deleted => Ok(Json(json!({"status": "success"})).into_response()),
        DeleteOutcome::UpstreamNotCleared => Ok(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Dialog system did not confirm deletion",
        )),
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.health.check().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// GET /info?id=<conversation>&language=<lang>
pub async fn get_info(
    State(state): State<GatewayState>,
    Query(query): Query<InfoQuery>,
) -> Result<Json<InfoResponse>, ApiError> {
    let id = query.id.unwrap_or_default();
    let info = state
        .orchestrator
        .info(&id, query.language.as_deref())
        .await?;
    Ok(Json(info))
}

/// GET /version
pub async fn get_version(State(state): State<GatewayState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: state.orchestrator.version().to_string(),
    })
}

/// GET /attachments/{file}
pub async fn get_attachment(
    State(state): State<GatewayState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let attachment = state.orchestrator.attachment(&file).await?;
    Ok((
        [
            (header::CONTENT_TYPE, attachment.content_type),
            (header::CACHE_CONTROL, "private, max-age=60".to_string()),
        ],
        attachment.data,
    )
        .into_response())
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Metrics disabled"),
    }
}
