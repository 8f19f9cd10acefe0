// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API for the Masdif gateway.
//!
//! Routes are thin: each handler delegates to the
//! [`TurnOrchestrator`](masdif_pipeline::TurnOrchestrator) and maps
//! [`MasdifError`](masdif_core::MasdifError) onto status codes.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use error::{ApiError, ErrorResponse};
pub use server::{GatewayState, router, start_server};
