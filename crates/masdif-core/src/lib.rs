// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Masdif gateway.
//!
//! Shared error type, domain types, and the adapter traits implemented by the
//! storage, dialog, and speech crates.

pub mod error;
pub mod traits;
pub mod types;

pub use error::MasdifError;
pub use types::{
    AdapterType, Attachment, AttachmentKind, Conversation, DialogEvent, DialogResponse, Feedback,
    HealthStatus, InputMetadata, Message, MessageExcerpt, QueueEntry, SynthesizedAudio, Tracker,
    TtsResult, now_timestamp,
};

pub use traits::{
    AttachmentScheduler, DialogEngine, PluginAdapter, SpeechSynthesizer, StorageAdapter,
};

/// Version string stamped into new conversations and reported by `/version`.
pub fn masdif_version() -> String {
    format!("v{}", env!("CARGO_PKG_VERSION"))
}
