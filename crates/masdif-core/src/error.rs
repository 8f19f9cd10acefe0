// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Masdif gateway.

use thiserror::Error;

/// The primary error type used across all Masdif adapter traits and the turn pipeline.
#[derive(Debug, Error)]
pub enum MasdifError {
    /// Configuration errors (missing feedback intent, empty language list, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Malformed client input (bad feedback directive, missing message_id, unsupported language).
    #[error("{0}")]
    BadRequest(String),

    /// A referenced conversation or message does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The dialog engine answered with a non-success status or timed out.
    #[error("dialog system error ({status}): {reason}")]
    Dialog { status: u16, reason: String },

    /// Speech synthesis failed after exhausting its retry budget.
    #[error("tts error: {message}")]
    Tts {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MasdifError {
    /// Shorthand for wrapping any error as a storage failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        MasdifError::Storage {
            source: Box::new(err),
        }
    }

    /// Returns true for errors caused by the caller rather than the gateway.
    pub fn is_client_error(&self) -> bool {
        matches!(self, MasdifError::BadRequest(_) | MasdifError::NotFound(_))
    }
}
