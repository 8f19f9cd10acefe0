// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Speech synthesis adapter trait.

use async_trait::async_trait;

use crate::error::MasdifError;
use crate::traits::adapter::PluginAdapter;
use crate::types::SynthesizedAudio;

#[async_trait]
pub trait SpeechSynthesizer: PluginAdapter {
    /// Synthesizes `text` in `language`.
    ///
    /// An unknown or missing `voice` falls back to the default voice for the
    /// language. Failures come back as [`MasdifError::Tts`].
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        voice: Option<&str>,
    ) -> Result<SynthesizedAudio, MasdifError>;
}
