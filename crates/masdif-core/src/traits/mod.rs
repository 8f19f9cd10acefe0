// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! External collaborators (dialog engine, speech synthesizer, storage) sit
//! behind these traits so the orchestrator can be driven by mocks in tests.

pub mod adapter;
pub mod dialog;
pub mod scheduler;
pub mod speech;
pub mod storage;

pub use adapter::PluginAdapter;
pub use dialog::DialogEngine;
pub use scheduler::AttachmentScheduler;
pub use speech::SpeechSynthesizer;
pub use storage::StorageAdapter;
