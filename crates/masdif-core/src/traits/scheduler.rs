// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deferred attachment cleanup.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::MasdifError;
use crate::types::AttachmentKind;

/// Schedules removal of a message's attachment after a delay.
///
/// Scheduling is fire-and-forget from the caller's perspective: the purge
/// runs later, and a message deleted in the meantime is not an error.
#[async_trait]
pub trait AttachmentScheduler: Send + Sync + 'static {
    async fn schedule_purge(
        &self,
        message_id: &str,
        kind: AttachmentKind,
        delay: Duration,
    ) -> Result<(), MasdifError>;
}
