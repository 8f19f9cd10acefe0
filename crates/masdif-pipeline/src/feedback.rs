// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feedback directives.
//!
//! A client rates an earlier bot reply by sending
//! `/feedback{"value": "<string>"}` together with the `message_id` of that
//! reply. The rating is stored on the target message and, when configured,
//! forwarded to the dialog engine as a synthetic intent.

use serde_json::Value;
use tracing::{debug, warn};

use masdif_config::model::FeedbackConfig;
use masdif_core::{MasdifError, StorageAdapter};

const DIRECTIVE_PREFIX: &str = "/feedback";

/// Result of scanning a turn's text for a feedback directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Ordinary text.
    Absent,
    /// Well-formed directive carrying this value.
    Value(String),
    /// Looked like a directive but did not parse.
    Malformed,
}

/// Parses `text` as a feedback directive.
///
/// The value may be wrapped in single quotes, which are stripped. A JSON
/// syntax error or a missing/non-string `value` makes the directive malformed.
pub fn parse_directive(text: &str) -> Directive {
    let Some(rest) = text.trim().strip_prefix(DIRECTIVE_PREFIX) else {
        return Directive::Absent;
    };
    // `/feedbacks` or `/feedback_form` are other intents.
    if rest
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
    {
        return Directive::Absent;
    }

    let parsed: Value = match serde_json::from_str(rest.trim()) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "feedback directive is not valid JSON");
            return Directive::Malformed;
        }
    };

    match parsed.get("value").and_then(Value::as_str) {
        Some(raw) => {
            let value = strip_single_quotes(raw.trim());
            if value.is_empty() {
                Directive::Malformed
            } else {
                Directive::Value(value.to_string())
            }
        }
        None => Directive::Malformed,
    }
}

fn strip_single_quotes(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

/// What the orchestrator should do with a turn after feedback handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Not a feedback turn; forward the text as-is.
    NotFeedback,
    /// Feedback was stored on `message_id`.
    ///
    /// `forward_text` is the text to send to the dialog engine instead of
    /// the directive, or `None` when forwarding is disabled and the turn
    /// should answer with the empty response.
    Accepted {
        value: String,
        message_id: String,
        forward_text: Option<String>,
    },
}

impl FeedbackOutcome {
    /// Text to send to the dialog engine, or `None` when the turn ends
    /// with the empty response.
    pub fn dialog_text<'t>(&'t self, user_text: &'t str) -> Option<&'t str> {
        match self {
            FeedbackOutcome::NotFeedback => Some(user_text),
            FeedbackOutcome::Accepted { forward_text, .. } => forward_text.as_deref(),
        }
    }
}

/// Applies feedback directives against storage.
pub struct FeedbackInterpreter<'a> {
    storage: &'a dyn StorageAdapter,
    config: &'a FeedbackConfig,
}

impl<'a> FeedbackInterpreter<'a> {
    pub fn new(storage: &'a dyn StorageAdapter, config: &'a FeedbackConfig) -> Self {
        Self { storage, config }
    }

    /// Interprets one inbound turn.
    ///
    /// Invalid feedback comes back as an error and leaves every message
    /// untouched: malformed directive and missing `message_id` are
    /// [`MasdifError::BadRequest`], an unknown target is
    /// [`MasdifError::NotFound`].
    pub async fn interpret(
        &self,
        conversation_id: &str,
        text: &str,
        message_id: Option<&str>,
    ) -> Result<FeedbackOutcome, MasdifError> {
        let message_id = message_id.filter(|id| !id.is_empty());

        let value = match parse_directive(text) {
            Directive::Absent => {
                if let Some(id) = message_id {
                    warn!(conversation_id, message_id = id, "message_id provided without feedback value");
                    return Err(MasdifError::BadRequest(
                        "message_id provided without feedback value".into(),
                    ));
                }
                return Ok(FeedbackOutcome::NotFeedback);
            }
            Directive::Malformed => {
                warn!(conversation_id, "malformed feedback value detected");
                return Err(MasdifError::BadRequest(
                    "Malformed feedback value detected".into(),
                ));
            }
            Directive::Value(value) => value,
        };

        let Some(message_id) = message_id else {
            warn!(conversation_id, "feedback directive without message_id");
            return Err(MasdifError::BadRequest("Missing message_id".into()));
        };

        let Some(target) = self.storage.get_message(conversation_id, message_id).await? else {
            warn!(conversation_id, message_id, "feedback target not found");
            return Err(MasdifError::NotFound(format!(
                "Message not found: {message_id}"
            )));
        };

        let forward_text = if self.config.forward {
            let intent = self.config.intent.as_deref().ok_or_else(|| {
                MasdifError::Config("feedback forwarding is enabled but no intent is set".into())
            })?;
            let reply_text = self
                .config
                .include_reply_text
                .then(|| target.reply_texts().join("."));
            Some(forward_text(intent, &value, reply_text.as_deref()))
        } else {
            None
        };

        self.storage
            .set_feedback(conversation_id, message_id, &value)
            .await?;
        debug!(conversation_id, message_id, feedback = %value, "feedback stored");

        Ok(FeedbackOutcome::Accepted {
            value,
            message_id: message_id.to_string(),
            forward_text,
        })
    }
}

/// Builds `/<intent>{"value": ..., "text": ...}` with proper JSON escaping.
pub fn forward_text(intent: &str, value: &str, reply_text: Option<&str>) -> String {
    let value = Value::String(value.to_string());
    match reply_text {
        Some(text) => format!(
            "/{intent}{{\"value\": {value}, \"text\": {}}}",
            Value::String(text.to_string())
        ),
        None => format!("/{intent}{{\"value\": {value}}}"),
    }
}
