// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Masdif gateway.
//!
//! WAL-mode SQLite with embedded migrations. All access is serialized through
//! a single `tokio-rusqlite` background thread, and typed query modules cover
//! conversations, messages, attachments, and the delayed job queue.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
