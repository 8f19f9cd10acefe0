// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Speech synthesis adapter for the Masdif gateway.
//!
//! [`TiroSynthesizer`] implements [`SpeechSynthesizer`] against a
//! Tiro-compatible TTS API. It owns a [`VoiceCache`] that a background task
//! refreshes periodically; start it with [`TiroSynthesizer::start_refresher`]
//! and stop it by cancelling the token passed in.

pub mod client;
pub mod naming;
pub mod voices;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use masdif_config::model::TtsConfig;
use masdif_core::{
    AdapterType, HealthStatus, MasdifError, PluginAdapter, SpeechSynthesizer, SynthesizedAudio,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use crate::client::{SpeechRequest, TtsClient, VoicesOutcome};
pub use crate::naming::audio_file_name;
pub use crate::voices::{Voice, VoiceCache};

pub struct TiroSynthesizer {
    client: TtsClient,
    cache: Arc<VoiceCache>,
    config: TtsConfig,
}

impl TiroSynthesizer {
    pub fn new(config: &TtsConfig) -> Result<Self, MasdifError> {
        let client = TtsClient::new(
            &config.url,
            &config.voices_path,
            &config.speech_path,
            Duration::from_secs(config.timeout_secs),
        )?
        .with_retry(
            config.retry_attempts,
            Duration::from_millis(config.retry_backoff_ms),
        );
        info!(url = %config.url, "TTS synthesizer configured");
        Ok(Self {
            client,
            cache: Arc::new(VoiceCache::new()),
            config: config.clone(),
        })
    }

    pub fn voice_cache(&self) -> Arc<VoiceCache> {
        Arc::clone(&self.cache)
    }

    /// Reloads the voice list from the provider.
    ///
    /// A rate-limited answer keeps the current list. Warns when the
    /// configured default voice is not offered for the configured language.
    pub async fn refresh_voices(&self) -> Result<usize, MasdifError> {
        match self.client.voices().await? {
            VoicesOutcome::Voices(voices) => {
                let voices: Vec<Voice> = voices
                    .into_iter()
                    .filter(|v| !v.voice_id.is_empty() && !v.language_code.is_empty())
                    .collect();
                let count = voices.len();
                self.cache.replace(voices);
                if !self
                    .cache
                    .supports(&self.config.default_voice, &self.config.language)
                {
                    warn!(
                        voice = %self.config.default_voice,
                        language = %self.config.language,
                        "configured default voice is not offered by the TTS service"
                    );
                }
                debug!(count, "voice cache refreshed");
                Ok(count)
            }
            VoicesOutcome::RateLimited => {
                warn!("voice refresh rate limited, keeping cached voices");
                Ok(self.cache.snapshot().len())
            }
        }
    }

    /// Spawns the periodic voice refresh. The task exits when `cancel` fires.
    pub fn start_refresher(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let period = Duration::from_secs(self.config.voice_refresh_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = this.refresh_voices().await {
                            warn!(error = %e, "voice refresh failed");
                        }
                    }
                    _ = cancel.cancelled() => {
                        debug!("voice refresher stopped");
                        break;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl PluginAdapter for TiroSynthesizer {
    fn name(&self) -> &str {
        "tiro-tts"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SpeechSynthesis
    }

    async fn health_check(&self) -> Result<HealthStatus, MasdifError> {
        Ok(match self.client.voices().await {
            Ok(VoicesOutcome::Voices(v)) if !v.is_empty() => HealthStatus::Healthy,
            Ok(VoicesOutcome::Voices(_)) => {
                HealthStatus::Unhealthy("TTS service offers no voices".to_string())
            }
            Ok(VoicesOutcome::RateLimited) => {
                warn!("TTS rate limited, assuming service is healthy");
                HealthStatus::Degraded("rate limited".to_string())
            }
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), MasdifError> {
        debug!("TTS synthesizer shutting down");
        Ok(())
    }
}

#[async_trait]
impl SpeechSynthesizer for TiroSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        voice: Option<&str>,
    ) -> Result<SynthesizedAudio, MasdifError> {
        if self.cache.is_empty() {
            warn!("voice cache empty, refreshing before synthesis");
            self.refresh_voices().await?;
        }
        let voice = self
            .cache
            .resolve(voice, language, &self.config.default_voice)?;
        info!(language, voice = %voice, chars = text.chars().count(), "synthesizing speech");

        let request = SpeechRequest {
            engine: self.config.engine.clone(),
            language_code: language.to_string(),
            lexicon_names: Vec::new(),
            output_format: self.config.output_format.clone(),
            sample_rate: self.config.sample_rate.clone(),
            text: text.to_string(),
            text_type: "text".to_string(),
            voice_id: voice.clone(),
        };
        let data = self.client.speech(&request).await?;

        Ok(SynthesizedAudio {
            data,
            content_type: naming::content_type_for(&self.config.output_format).to_string(),
            voice,
        })
    }
}
