// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Masdif integration tests.
//!
//! Mock adapters and a temp-database harness for deterministic tests
//! without a Rasa server or TTS service.
//!
//! - [`MockDialogEngine`]: in-memory tracker with scripted replies
//! - [`MockSynthesizer`]: returns fixed audio, can be switched to fail
//! - [`RecordingScheduler`]: captures scheduled attachment purges
//! - [`TestHarness`]: initialized SQLite storage in a temp directory

pub mod harness;
pub mod mock_dialog;
pub mod mock_speech;

pub use harness::TestHarness;
pub use mock_dialog::{DialogCall, MockDialogEngine};
pub use mock_speech::{MockSynthesizer, RecordingScheduler};
