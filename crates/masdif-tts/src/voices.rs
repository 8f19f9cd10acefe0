// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cached list of voices the speech provider supports.
//!
//! Read on every synthesis and replaced wholesale by the refresher, so reads
//! never block on a refresh in progress.

use std::sync::Arc;

use arc_swap::ArcSwap;
use masdif_core::MasdifError;
use serde::Deserialize;

/// A voice as reported by the provider's voices endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Voice {
    pub voice_id: String,
    pub language_code: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub language_name: Option<String>,
}

#[derive(Debug, Default)]
pub struct VoiceCache {
    voices: ArcSwap<Vec<Voice>>,
}

impl VoiceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in a fresh voice list.
    pub fn replace(&self, voices: Vec<Voice>) {
        self.voices.store(Arc::new(voices));
    }

    pub fn snapshot(&self) -> Arc<Vec<Voice>> {
        self.voices.load_full()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.load().is_empty()
    }

    /// True when `voice` exists for `language`.
    pub fn supports(&self, voice: &str, language: &str) -> bool {
        self.voices
            .load()
            .iter()
            .any(|v| v.voice_id == voice && v.language_code == language)
    }

    /// Picks the voice to synthesize with.
    ///
    /// Order: the requested voice if it speaks `language`, then the configured
    /// default if it does, then the first voice for `language`, then the first
    /// voice at all.
    pub fn resolve(
        &self,
        requested: Option<&str>,
        language: &str,
        configured_default: &str,
    ) -> Result<String, MasdifError> {
        if let Some(voice) = requested {
            if self.supports(voice, language) {
                return Ok(voice.to_string());
            }
        }
        if self.supports(configured_default, language) {
            return Ok(configured_default.to_string());
        }

        let voices = self.voices.load();
        voices
            .iter()
            .find(|v| v.language_code == language)
            .or_else(|| voices.first())
            .map(|v| v.voice_id.clone())
            .ok_or_else(|| MasdifError::Tts {
                message: "no TTS voices available".to_string(),
                source: None,
            })
    }
}
