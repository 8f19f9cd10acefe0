// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp-directory storage harness.

use std::sync::Arc;

use masdif_config::model::{MasdifConfig, StorageConfig};
use masdif_core::{MasdifError, StorageAdapter};
use masdif_storage::SqliteStorage;
use tempfile::TempDir;

use crate::{MockDialogEngine, MockSynthesizer, RecordingScheduler};

/// Initialized storage plus mock collaborators.
///
/// The temp directory lives as long as the harness.
pub struct TestHarness {
    pub config: MasdifConfig,
    pub storage: Arc<SqliteStorage>,
    pub dialog: Arc<MockDialogEngine>,
    pub tts: Arc<MockSynthesizer>,
    pub scheduler: Arc<RecordingScheduler>,
    _dir: TempDir,
}

impl TestHarness {
    /// Harness with default config and TTS enabled.
    pub async fn new() -> Result<Self, MasdifError> {
        let mut config = MasdifConfig::default();
        config.tts.enabled = true;
        Self::with_config(config).await
    }

    /// Harness with the given config. `storage.database_path` is replaced by a temp file.
    pub async fn with_config(mut config: MasdifConfig) -> Result<Self, MasdifError> {
        let dir = tempfile::tempdir().map_err(MasdifError::storage)?;
        config.storage = StorageConfig {
            database_path: dir.path().join("masdif.db").display().to_string(),
            wal_mode: true,
        };
        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        Ok(Self {
            config,
            storage,
            dialog: Arc::new(MockDialogEngine::new()),
            tts: Arc::new(MockSynthesizer::new()),
            scheduler: Arc::new(RecordingScheduler::new()),
            _dir: dir,
        })
    }
}
