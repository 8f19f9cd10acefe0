// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock speech synthesizer and attachment scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use masdif_core::{
    AdapterType, AttachmentKind, AttachmentScheduler, HealthStatus, MasdifError, PluginAdapter,
    SpeechSynthesizer, SynthesizedAudio,
};

/// Synthesizer returning a fixed MP3 header, recording every request.
pub struct MockSynthesizer {
    fail: AtomicBool,
    calls: Mutex<Vec<(String, String, Option<String>)>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Makes subsequent synthesis calls and health checks fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// `(text, language, voice)` for each synthesis request so far.
    pub async fn calls(&self) -> Vec<(String, String, Option<String>)> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockSynthesizer {
    fn name(&self) -> &str {
        "mock-tts"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SpeechSynthesis
    }

    async fn health_check(&self) -> Result<HealthStatus, MasdifError> {
        if self.fail.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("mock failure".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), MasdifError> {
        Ok(())
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        voice: Option<&str>,
    ) -> Result<SynthesizedAudio, MasdifError> {
        self.calls.lock().await.push((
            text.to_string(),
            language.to_string(),
            voice.map(str::to_string),
        ));
        if self.fail.load(Ordering::SeqCst) {
            return Err(MasdifError::Tts {
                message: "mock synthesis failure".into(),
                source: None,
            });
        }
        Ok(SynthesizedAudio {
            data: vec![0xff, 0xfb, 0x90, 0x00],
            content_type: "audio/mpeg".into(),
            voice: voice.unwrap_or("Dora").to_string(),
        })
    }
}

/// Scheduler that only records what it was asked to purge.
#[derive(Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<(String, AttachmentKind, Duration)>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn scheduled(&self) -> Vec<(String, AttachmentKind, Duration)> {
        self.scheduled.lock().await.clone()
    }
}

#[async_trait]
impl AttachmentScheduler for RecordingScheduler {
    async fn schedule_purge(
        &self,
        message_id: &str,
        kind: AttachmentKind,
        delay: Duration,
    ) -> Result<(), MasdifError> {
        self.scheduled
            .lock()
            .await
            .push((message_id.to_string(), kind, delay));
        Ok(())
    }
}
