// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a typo in a config file
//! fails at startup instead of silently falling back to a default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level Masdif configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MasdifConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// HTTP listener and public URL settings.
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Dialog engine (Rasa HTTP API) connection.
    #[serde(default)]
    pub dialog: DialogConfig,

    /// Speech synthesis service connection and defaults.
    #[serde(default)]
    pub tts: TtsConfig,

    /// Whether and how feedback is forwarded to the dialog engine.
    #[serde(default)]
    pub feedback: FeedbackConfig,

    #[serde(default)]
    pub languages: LanguagesConfig,

    /// Message of the day served by `/info`.
    #[serde(default)]
    pub motd: MotdConfig,

    /// Delayed job worker.
    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, or error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used to build attachment links.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Bearer token for admin endpoints. Admin routes are disabled when unset.
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
            admin_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("masdif").join("masdif.db"))
        .unwrap_or_else(|| "masdif.db".into())
        .display()
        .to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DialogConfig {
    #[serde(default = "default_dialog_url")]
    pub url: String,

    /// Path prefix in front of every Rasa endpoint (e.g. behind a proxy).
    #[serde(default)]
    pub base_path: String,

    /// Token sent both as `token` query parameter and `Authorization` header.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_dialog_timeout")]
    pub timeout_secs: u64,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            url: default_dialog_url(),
            base_path: String::new(),
            token: None,
            timeout_secs: default_dialog_timeout(),
        }
    }
}

fn default_dialog_url() -> String {
    "http://localhost:5005".to_string()
}

fn default_dialog_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TtsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_tts_url")]
    pub url: String,

    #[serde(default = "default_voices_path")]
    pub voices_path: String,

    #[serde(default = "default_speech_path")]
    pub speech_path: String,

    /// Language the default voice is validated against.
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_voice")]
    pub default_voice: String,

    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default = "default_output_format")]
    pub output_format: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: String,

    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per synthesis when rate limited.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Backoff unit; attempt `n` waits `n * retry_backoff_ms`.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_voice_refresh_secs")]
    pub voice_refresh_secs: u64,

    /// Seconds an audio attachment stays downloadable.
    #[serde(default = "default_attachment_timeout_secs")]
    pub attachment_timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_tts_url(),
            voices_path: default_voices_path(),
            speech_path: default_speech_path(),
            language: default_language(),
            default_voice: default_voice(),
            engine: default_engine(),
            output_format: default_output_format(),
            sample_rate: default_sample_rate(),
            timeout_secs: default_tts_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            voice_refresh_secs: default_voice_refresh_secs(),
            attachment_timeout_secs: default_attachment_timeout_secs(),
        }
    }
}

fn default_tts_url() -> String {
    "https://tts.tiro.is".to_string()
}

fn default_voices_path() -> String {
    "/v0/voices".to_string()
}

fn default_speech_path() -> String {
    "/v0/speech".to_string()
}

fn default_language() -> String {
    "is-IS".to_string()
}

fn default_voice() -> String {
    "Dora".to_string()
}

fn default_engine() -> String {
    "standard".to_string()
}

/// Audio formats the speech service can return.
pub const OUTPUT_FORMATS: &[&str] = &["mp3", "ogg_vorbis", "pcm"];

fn default_output_format() -> String {
    "mp3".to_string()
}

fn default_sample_rate() -> String {
    "22050".to_string()
}

fn default_tts_timeout() -> u64 {
    10
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_voice_refresh_secs() -> u64 {
    3600
}

fn default_attachment_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackConfig {
    /// Forward accepted feedback to the dialog engine as an intent.
    #[serde(default)]
    pub forward: bool,

    /// Intent name used for forwarded feedback. Required when `forward` is set.
    #[serde(default)]
    pub intent: Option<String>,

    /// Include the rated reply's text in the forwarded payload.
    #[serde(default)]
    pub include_reply_text: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LanguagesConfig {
    #[serde(default = "default_language")]
    pub default: String,

    #[serde(default = "default_supported_languages")]
    pub supported: Vec<LanguageEntry>,
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            default: default_language(),
            supported: default_supported_languages(),
        }
    }
}

impl LanguagesConfig {
    pub fn is_supported(&self, lang: &str) -> bool {
        self.supported.iter().any(|l| l.lang == lang)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageEntry {
    pub lang: String,
    pub explanation: String,
}

fn default_supported_languages() -> Vec<LanguageEntry> {
    vec![
        LanguageEntry {
            lang: "is-IS".to_string(),
            explanation: "Íslenska".to_string(),
        },
        LanguageEntry {
            lang: "en-US".to_string(),
            explanation: "English".to_string(),
        },
    ]
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MotdConfig {
    /// Intent triggered on the dialog engine to fetch a dynamic MOTD.
    #[serde(default)]
    pub intent: Option<String>,

    /// Fallback MOTD lines keyed by language.
    #[serde(default)]
    pub default: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}
