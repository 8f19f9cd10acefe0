// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the storage, client, and pipeline crates.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Timestamp format used for every persisted `*_at` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Returns the current UTC time formatted with [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues (e.g. rate limited).
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

impl HealthStatus {
    /// Healthy and degraded both count as "up" for aggregate health.
    pub fn is_up(&self) -> bool {
        !matches!(self, HealthStatus::Unhealthy(_))
    }
}

/// Identifies the type of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    DialogEngine,
    SpeechSynthesis,
    Storage,
    Observability,
}

/// User rating of a prior bot reply. Last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Feedback {
    #[default]
    None,
    Positive,
    Negative,
    /// Any other client-defined value, stored verbatim.
    Custom(String),
}

impl From<String> for Feedback {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" | "none" => Feedback::None,
            "positive" => Feedback::Positive,
            "negative" => Feedback::Negative,
            _ => Feedback::Custom(value),
        }
    }
}

impl From<&str> for Feedback {
    fn from(value: &str) -> Self {
        Feedback::from(value.to_string())
    }
}

impl From<Feedback> for String {
    fn from(value: Feedback) -> Self {
        value.as_str().to_string()
    }
}

impl Feedback {
    pub fn as_str(&self) -> &str {
        match self {
            Feedback::None => "none",
            Feedback::Positive => "positive",
            Feedback::Negative => "negative",
            Feedback::Custom(v) => v,
        }
    }
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of speech synthesis for one turn.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TtsResult {
    #[default]
    None,
    Disabled,
    Success,
    Error,
}

/// Tag identifying which attachment of a message a purge applies to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttachmentKind {
    TtsAudio,
}

/// Client supplied metadata for one turn.
///
/// The known keys are typed; anything else is carried through untouched in
/// `extra` so newer clients do not lose data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputMetadata {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "loose_bool"
    )]
    pub asr_generated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "loose_bool"
    )]
    pub tts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InputMetadata {
    /// Metadata used when a request carries none, and for control messages.
    pub fn bootstrap(language: &str) -> Self {
        Self {
            asr_generated: Some(false),
            language: Some(language.to_string()),
            ..Self::default()
        }
    }
}

/// Accepts `true`/`false` as JSON booleans or as (case-insensitive) strings.
/// Anything else that is not null reads as `false`.
fn loose_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => Some(s.eq_ignore_ascii_case("true")),
        Some(_) => Some(false),
    })
}

/// A conversation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "conversation_id")]
    pub id: String,
    pub status: String,
    pub masdif_version: Option<String>,
    pub last_message_updated_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    pub fn new(masdif_version: &str) -> Self {
        let now = now_timestamp();
        Self {
            id: uuid_v4(),
            status: "new".to_string(),
            masdif_version: Some(masdif_version.to_string()),
            last_message_updated_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// One turn of a conversation: the inbound text plus everything learned while answering it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub text: String,
    pub meta_data: InputMetadata,
    /// Final reply array, or the upstream reason phrase when the dialog call failed.
    pub reply: Value,
    pub action_reply: Option<Value>,
    pub nlu: Option<Value>,
    pub events: Vec<Value>,
    pub feedback: Feedback,
    pub tts_result: TtsResult,
    pub time_dialog: Option<f64>,
    pub time_tts: Option<f64>,
    pub time_overall: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Message {
    pub fn new(
        conversation_id: &str,
        text: &str,
        meta_data: InputMetadata,
        tts_result: TtsResult,
    ) -> Self {
        let now = now_timestamp();
        Self {
            id: uuid_v4(),
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            meta_data,
            reply: Value::Array(Vec::new()),
            action_reply: None,
            nlu: None,
            events: Vec::new(),
            feedback: Feedback::None,
            tts_result,
            time_dialog: None,
            time_tts: None,
            time_overall: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Text parts of the stored reply, in order.
    pub fn reply_texts(&self) -> Vec<String> {
        match &self.reply {
            Value::Array(elements) => elements
                .iter()
                .filter_map(|e| e.get("text").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Lightweight listing row for user-facing messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageExcerpt {
    pub message_id: String,
    pub text: String,
    pub feedback: Feedback,
    pub created_at: String,
}

/// A transient binary resource owned by a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Unguessable file name, also the public lookup key.
    pub file_name: String,
    pub message_id: String,
    pub kind: AttachmentKind,
    pub content_type: String,
    pub data: Vec<u8>,
    pub created_at: String,
}

/// A persisted delayed job.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub run_after: String,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
}

/// Event types the gateway appends to a dialog engine tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogEvent {
    User { text: String },
    Restart,
    Other { name: String, text: String },
}

impl DialogEvent {
    pub fn name(&self) -> &str {
        match self {
            DialogEvent::User { .. } => "user",
            DialogEvent::Restart => "restart",
            DialogEvent::Other { name, .. } => name,
        }
    }
}

/// Result of any dialog engine call: an HTTP-like status, its reason
/// phrase, and the decoded JSON body (`Null` when there was none).
#[derive(Debug, Clone, PartialEq)]
pub struct DialogResponse {
    pub status: u16,
    pub reason: String,
    pub body: Value,
}

impl DialogResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as a tracker. `None` on failure or unexpected shape.
    pub fn tracker(&self) -> Option<Tracker> {
        if !self.is_success() {
            return None;
        }
        serde_json::from_value(self.body.clone()).ok()
    }
}

/// The dialog engine's per-conversation state.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Tracker {
    #[serde(default)]
    pub latest_event_time: Option<f64>,
    #[serde(default)]
    pub latest_message: Option<Value>,
    #[serde(default)]
    pub events: Vec<Value>,
}

/// Audio returned by a speech synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub data: Vec<u8>,
    pub content_type: String,
    /// Voice actually used after validation and fallback.
    pub voice: String,
}

fn uuid_v4() -> String {
    uuid::Uuid::new_v4().to_string()
}
