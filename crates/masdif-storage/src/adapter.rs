// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use masdif_config::model::StorageConfig;
use masdif_core::{
    AdapterType, Attachment, AttachmentKind, Conversation, HealthStatus, MasdifError, Message,
    MessageExcerpt, PluginAdapter, QueueEntry, StorageAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened by [`StorageAdapter::initialize`]; every other
/// call before that fails with a storage error.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, MasdifError> {
        self.db.get().ok_or_else(|| MasdifError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MasdifError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MasdifError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), MasdifError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| MasdifError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), MasdifError> {
        self.db()?.checkpoint().await
    }

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), MasdifError> {
        queries::conversations::create_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, MasdifError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, MasdifError> {
        queries::conversations::list_conversations(self.db()?).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool, MasdifError> {
        queries::conversations::delete_conversation(self.db()?, id).await
    }

    async fn insert_message(&self, message: &Message) -> Result<(), MasdifError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn update_message(&self, message: &Message) -> Result<(), MasdifError> {
        queries::messages::update_message(self.db()?, message).await
    }

    async fn get_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<Option<Message>, MasdifError> {
        queries::messages::get_message(self.db()?, conversation_id, message_id).await
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, MasdifError> {
        queries::messages::get_messages_for_conversation(self.db()?, conversation_id).await
    }

    async fn set_feedback(
        &self,
        conversation_id: &str,
        message_id: &str,
        feedback: &str,
    ) -> Result<bool, MasdifError> {
        queries::messages::set_feedback(self.db()?, conversation_id, message_id, feedback).await
    }

    async fn list_excerpts(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageExcerpt>, MasdifError> {
        queries::messages::list_excerpts(self.db()?, conversation_id).await
    }

    async fn insert_attachment(&self, attachment: &Attachment) -> Result<(), MasdifError> {
        queries::attachments::insert_attachment(self.db()?, attachment).await
    }

    async fn get_attachment(&self, file_name: &str) -> Result<Option<Attachment>, MasdifError> {
        queries::attachments::get_attachment(self.db()?, file_name).await
    }

    async fn purge_attachments(
        &self,
        message_id: &str,
        kind: AttachmentKind,
    ) -> Result<usize, MasdifError> {
        queries::attachments::purge_attachments(self.db()?, message_id, kind).await
    }

    async fn purge_attachments_older_than(&self, cutoff: &str) -> Result<usize, MasdifError> {
        queries::attachments::purge_older_than(self.db()?, cutoff).await
    }

    async fn enqueue(
        &self,
        queue_name: &str,
        payload: &str,
        run_after: &str,
    ) -> Result<i64, MasdifError> {
        queries::queue::enqueue(self.db()?, queue_name, payload, run_after).await
    }

    async fn dequeue(&self, queue_name: &str) -> Result<Option<QueueEntry>, MasdifError> {
        queries::queue::dequeue(self.db()?, queue_name).await
    }

    async fn ack(&self, id: i64) -> Result<(), MasdifError> {
        queries::queue::ack(self.db()?, id).await
    }

    async fn fail(&self, id: i64) -> Result<(), MasdifError> {
        queries::queue::fail(self.db()?, id).await
    }

    async fn prune_failed_jobs(&self, queue_name: &str, cutoff: &str) -> Result<usize, MasdifError> {
        queries::queue::prune_failed(self.db()?, queue_name, cutoff).await
    }

    async fn queue_depth(&self, queue_name: &str) -> Result<usize, MasdifError> {
        queries::queue::depth(self.db()?, queue_name).await
    }
}
