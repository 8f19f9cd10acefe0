// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message of the day and supported languages for `/info`.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use masdif_config::model::{LanguageEntry, LanguagesConfig, MotdConfig};
use masdif_core::{DialogEngine, MasdifError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoResponse {
    pub supported_languages: Vec<LanguageEntry>,
    pub motd: Vec<String>,
}

/// Builds the `/info` payload for an existing conversation.
///
/// The MOTD is asked from the dialog engine by triggering the configured
/// intent. Any failure, or a MOTD for another language, falls back to the
/// configured default lines.
pub async fn info(
    dialog: &dyn DialogEngine,
    motd: &MotdConfig,
    languages: &LanguagesConfig,
    conversation_id: &str,
    language: Option<&str>,
) -> Result<InfoResponse, MasdifError> {
    let Some(intent) = motd.intent.as_deref() else {
        return Err(MasdifError::Config("no MOTD intent configured".into()));
    };
    if languages.supported.is_empty() {
        return Err(MasdifError::Config("no supported languages configured".into()));
    }

    let language = language.unwrap_or(&languages.default);
    if !languages.is_supported(language) {
        return Err(MasdifError::NotFound("Unsupported language".into()));
    }

    let lines = match dialog_motd(dialog, conversation_id, intent, language).await {
        Some(lines) => lines,
        None => default_motd(motd, language, &languages.default),
    };

    Ok(InfoResponse {
        supported_languages: languages.supported.clone(),
        motd: lines,
    })
}

fn default_motd(motd: &MotdConfig, language: &str, default_language: &str) -> Vec<String> {
    motd.default
        .get(language)
        .or_else(|| motd.default.get(default_language))
        .cloned()
        .unwrap_or_default()
}

async fn dialog_motd(
    dialog: &dyn DialogEngine,
    conversation_id: &str,
    intent: &str,
    language: &str,
) -> Option<Vec<String>> {
    info!(conversation_id, language, "requesting MOTD from dialog engine");
    let response = dialog
        .trigger_intent(conversation_id, intent, &json!({ "language": language }))
        .await;
    if !response.is_success() {
        warn!(status = response.status, "MOTD intent failed");
        return None;
    }
    parse_motd(&response.body, language)
}

/// Extracts the MOTD from a trigger-intent response.
///
/// The first message's text must be JSON of the form
/// `{"motd": {"motd": [..], "language": ".."}}` with a matching language.
pub fn parse_motd(body: &Value, language: &str) -> Option<Vec<String>> {
    let Some(text) = body
        .get("messages")
        .and_then(|m| m.get(0))
        .and_then(|m| m.get("text"))
        .and_then(Value::as_str)
    else {
        warn!("MOTD intent returned no messages");
        return None;
    };

    let parsed: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "MOTD text is not JSON");
            return None;
        }
    };

    let motd = &parsed["motd"];
    let got = &motd["language"];
    if got.as_str() != Some(language) {
        warn!(expected = language, got = %got, "MOTD for wrong language");
        return None;
    }
    let lines = motd["motd"].as_array()?;
    Some(
        lines
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}
