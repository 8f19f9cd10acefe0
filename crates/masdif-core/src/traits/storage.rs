// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends.

use async_trait::async_trait;

use crate::error::MasdifError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Attachment, AttachmentKind, Conversation, Message, MessageExcerpt, QueueEntry,
};

/// Persistence for conversations, messages, attachments, and delayed jobs.
///
/// Deleting a conversation removes its messages and their attachments.
/// Inserting or updating a message bumps the owning conversation's
/// `last_message_updated_at`.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and runs migrations.
    async fn initialize(&self) -> Result<(), MasdifError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), MasdifError>;

    // --- Conversations ---

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), MasdifError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, MasdifError>;

    async fn list_conversations(&self) -> Result<Vec<Conversation>, MasdifError>;

    /// Returns `false` when no such conversation existed.
    async fn delete_conversation(&self, id: &str) -> Result<bool, MasdifError>;

    // --- Messages ---

    async fn insert_message(&self, message: &Message) -> Result<(), MasdifError>;

    async fn update_message(&self, message: &Message) -> Result<(), MasdifError>;

    /// Looks up a message scoped to its conversation.
    async fn get_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<Option<Message>, MasdifError>;

    /// All messages of a conversation in creation order.
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, MasdifError>;

    /// Returns `false` when the message does not exist in the conversation.
    async fn set_feedback(
        &self,
        conversation_id: &str,
        message_id: &str,
        feedback: &str,
    ) -> Result<bool, MasdifError>;

    /// User-facing messages only; control messages are excluded.
    async fn list_excerpts(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageExcerpt>, MasdifError>;

    // --- Attachments ---

    async fn insert_attachment(&self, attachment: &Attachment) -> Result<(), MasdifError>;

    async fn get_attachment(&self, file_name: &str) -> Result<Option<Attachment>, MasdifError>;

    /// Removes attachments of `kind` belonging to `message_id`. Returns the count removed.
    async fn purge_attachments(
        &self,
        message_id: &str,
        kind: AttachmentKind,
    ) -> Result<usize, MasdifError>;

    /// Removes every attachment created before `cutoff` (a stored timestamp string).
    async fn purge_attachments_older_than(&self, cutoff: &str) -> Result<usize, MasdifError>;

    // --- Delayed jobs ---

    /// Enqueues a job that becomes due at `run_after`. Returns the job id.
    async fn enqueue(
        &self,
        queue_name: &str,
        payload: &str,
        run_after: &str,
    ) -> Result<i64, MasdifError>;

    /// Claims the oldest due pending job, if any.
    async fn dequeue(&self, queue_name: &str) -> Result<Option<QueueEntry>, MasdifError>;

    /// Removes a finished job.
    async fn ack(&self, id: i64) -> Result<(), MasdifError>;

    /// Marks a job failed, returning it to pending while attempts remain.
    async fn fail(&self, id: i64) -> Result<(), MasdifError>;

    /// Deletes jobs that exhausted their attempts before `cutoff`.
    async fn prune_failed_jobs(&self, queue_name: &str, cutoff: &str) -> Result<usize, MasdifError>;

    /// Rows currently held for a queue.
    async fn queue_depth(&self, queue_name: &str) -> Result<usize, MasdifError>;
}
