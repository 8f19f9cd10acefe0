// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation pipeline for the Masdif gateway.
//!
//! - [`TurnOrchestrator`]: conversation lifecycle and per-turn processing
//! - [`feedback`]: feedback directive parsing and application
//! - [`reply`]: reply normalization and tracker filtering
//! - [`cleanup`]: persisted attachment purge jobs and their worker
//! - [`health`]: aggregate subsystem health
//! - [`shutdown`]: signal handling

pub mod cleanup;
pub mod feedback;
pub mod health;
pub mod metadata;
pub mod motd;
pub mod orchestrator;
pub mod reply;
pub mod shutdown;

pub use cleanup::{CLEANUP_QUEUE, CleanupWorker, JobsMonitor, QueueScheduler};
pub use feedback::{Directive, FeedbackInterpreter, FeedbackOutcome};
pub use health::{HealthChecker, HealthReport};
pub use metadata::ResolvedMetadata;
pub use motd::InfoResponse;
pub use orchestrator::{ConversationHistory, DeleteOutcome, TurnOrchestrator, TurnRequest};
