// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of pipeline errors to HTTP responses.
//!
//! Every error body is `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use masdif_core::MasdifError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Wrapper so handlers can return `Result<_, ApiError>` and use `?`.
#[derive(Debug)]
pub struct ApiError(pub MasdifError);

impl From<MasdifError> for ApiError {
    fn from(err: MasdifError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            MasdifError::BadRequest(msg) => error_response(StatusCode::BAD_REQUEST, msg),
            MasdifError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, msg),
            MasdifError::Dialog { status, reason } => {
                tracing::warn!(status, reason = %reason, "dialog system error");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Dialog system error: {reason}"),
                )
            }
            MasdifError::Config(msg) => {
                tracing::error!(error = %msg, "configuration error while handling request");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server configuration error",
                )
            }
            other => {
                tracing::error!(error = %other, "request failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}
