// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-turn metadata resolution.
//!
//! Client metadata is optional and loosely typed. Missing per-message values
//! get silent defaults here; an unsupported language is rejected.

use serde_json::Value;

use masdif_config::model::LanguagesConfig;
use masdif_core::{InputMetadata, MasdifError, TtsResult};

/// Metadata for one turn after defaults have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMetadata {
    /// Metadata as persisted on the message and echoed to the client.
    pub meta: InputMetadata,
    pub language: String,
    pub voice: Option<String>,
    /// Whether speech should be synthesized for this turn.
    pub use_tts: bool,
    /// Initial `tts_result` for the new message.
    pub tts_result: TtsResult,
}

impl ResolvedMetadata {
    /// Resolves client metadata against the language list and the global TTS switch.
    ///
    /// `tts` defaults to enabled when the client leaves it out, but is forced
    /// off when synthesis is disabled server-side.
    pub fn resolve(
        input: Option<InputMetadata>,
        languages: &LanguagesConfig,
        tts_enabled: bool,
    ) -> Result<Self, MasdifError> {
        let mut meta = input.unwrap_or_else(|| InputMetadata::bootstrap(&languages.default));

        let language = meta
            .language
            .clone()
            .unwrap_or_else(|| languages.default.clone());
        if !languages.is_supported(&language) {
            return Err(MasdifError::BadRequest("Unsupported language".into()));
        }
        meta.language = Some(language.clone());

        let use_tts = meta.tts.unwrap_or(true) && tts_enabled;
        meta.tts = Some(use_tts);
        let voice = meta.voice_id.clone().filter(|v| !v.is_empty());

        Ok(Self {
            meta,
            language,
            voice,
            use_tts,
            tts_result: if use_tts {
                TtsResult::None
            } else {
                TtsResult::Disabled
            },
        })
    }

    /// Metadata appended to every reply element: client metadata plus the resolved language.
    pub fn reply_metadata(&self) -> Value {
        serde_json::to_value(&self.meta).unwrap_or_else(|_| Value::Object(Default::default()))
    }

    /// Metadata of the canonical empty response, with `tts` and `asr_generated` forced off.
    pub fn empty_reply_metadata(&self) -> Value {
        let mut meta = self.meta.clone();
        meta.asr_generated = Some(false);
        meta.tts = Some(false);
        serde_json::to_value(meta).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}
