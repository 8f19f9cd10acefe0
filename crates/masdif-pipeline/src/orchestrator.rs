// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation turn orchestration.
//!
//! One turn takes a client message through feedback handling, the dialog
//! engine, optional speech synthesis, and persistence, and produces the
//! reply array sent back to the client. Turns of different conversations
//! run concurrently; nothing here locks per conversation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use masdif_config::model::MasdifConfig;
use masdif_core::{
    Attachment, AttachmentKind, AttachmentScheduler, Conversation, DialogEngine, DialogEvent,
    InputMetadata, MasdifError, Message, MessageExcerpt, SpeechSynthesizer, StorageAdapter,
    SynthesizedAudio, TtsResult, now_timestamp,
};
use masdif_tts::naming::{audio_file_name, extension_for};

use crate::feedback::FeedbackInterpreter;
use crate::metadata::ResolvedMetadata;
use crate::motd::{self, InfoResponse};
use crate::reply;

/// Body of `PATCH /conversations/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "messageId")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<InputMetadata>,
}

/// Full history of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationHistory {
    pub conversation_id: String,
    pub messages: Vec<Message>,
}

/// Result of deleting a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Local rows removed and the dialog engine confirmed an empty tracker.
    Deleted,
    /// Local rows removed, but the dialog engine did not confirm.
    UpstreamNotCleared,
}

fn conversation_not_found() -> MasdifError {
    MasdifError::NotFound("Conversation not found".into())
}

/// Drives conversations against the injected collaborators.
pub struct TurnOrchestrator {
    config: Arc<MasdifConfig>,
    storage: Arc<dyn StorageAdapter>,
    dialog: Arc<dyn DialogEngine>,
    tts: Option<Arc<dyn SpeechSynthesizer>>,
    scheduler: Arc<dyn AttachmentScheduler>,
    version: String,
}

impl TurnOrchestrator {
    pub fn new(
        config: Arc<MasdifConfig>,
        storage: Arc<dyn StorageAdapter>,
        dialog: Arc<dyn DialogEngine>,
        scheduler: Arc<dyn AttachmentScheduler>,
    ) -> Self {
        Self {
            config,
            storage,
            dialog,
            tts: None,
            scheduler,
            version: masdif_core::masdif_version(),
        }
    }

    /// Enables speech synthesis. Has no effect while `tts.enabled` is false.
    pub fn with_tts(mut self, tts: Arc<dyn SpeechSynthesizer>) -> Self {
        self.tts = Some(tts);
        self
    }

    pub fn config(&self) -> &MasdifConfig {
        &self.config
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn speech(&self) -> Option<&Arc<dyn SpeechSynthesizer>> {
        self.tts.as_ref().filter(|_| self.config.tts.enabled)
    }

    /// Creates a conversation and initializes the dialog engine session.
    ///
    /// The conversation and its `/restart` bootstrap message are stored
    /// before the dialog engine is contacted, so they persist even when the
    /// engine rejects the restart event.
    pub async fn create_conversation(&self) -> Result<String, MasdifError> {
        let conversation = Conversation::new(&self.version);
        self.storage.create_conversation(&conversation).await?;

        let meta = InputMetadata::bootstrap(&self.config.languages.default);
        let mut bootstrap =
            Message::new(&conversation.id, "/restart", meta.clone(), TtsResult::None);
        self.storage.insert_message(&bootstrap).await?;

        let response = self
            .dialog
            .add_event(&conversation.id, &DialogEvent::Restart, &meta)
            .await;

        if response.is_success() {
            bootstrap.reply = response.body;
            self.storage.update_message(&bootstrap).await?;
            info!(conversation_id = %conversation.id, "conversation created");
            #[cfg(feature = "prometheus")]
            masdif_prometheus::record_conversation("created");
            Ok(conversation.id)
        } else {
            bootstrap.reply = Value::String(response.reason.clone());
            self.storage.update_message(&bootstrap).await?;
            error!(
                conversation_id = %conversation.id,
                status = response.status,
                reason = %response.reason,
                "dialog engine rejected restart event"
            );
            Err(MasdifError::Dialog {
                status: response.status,
                reason: response.reason,
            })
        }
    }

    /// Handles one inbound turn and returns the reply array.
    pub async fn handle_turn(
        &self,
        conversation_id: &str,
        request: TurnRequest,
    ) -> Result<Value, MasdifError> {
        let result = self.run_turn(conversation_id, request).await;
        #[cfg(feature = "prometheus")]
        {
            if let Err(e) = &result {
                let outcome = match e {
                    e if e.is_client_error() => "client_error",
                    MasdifError::Dialog { .. } => "dialog_error",
                    _ => "error",
                };
                masdif_prometheus::record_turn(outcome);
            }
        }
        result
    }

    async fn run_turn(
        &self,
        conversation_id: &str,
        request: TurnRequest,
    ) -> Result<Value, MasdifError> {
        let started = Instant::now();

        if self.storage.get_conversation(conversation_id).await?.is_none() {
            return Err(conversation_not_found());
        }

        let resolved = ResolvedMetadata::resolve(
            request.metadata,
            &self.config.languages,
            self.speech().is_some(),
        )?;

        let feedback = FeedbackInterpreter::new(self.storage.as_ref(), &self.config.feedback)
            .interpret(conversation_id, &request.text, request.message_id.as_deref())
            .await?;

        let mut message = Message::new(
            conversation_id,
            &request.text,
            resolved.meta.clone(),
            resolved.tts_result,
        );
        self.storage.insert_message(&message).await?;
        debug!(conversation_id, message_id = %message.id, "turn started");

        let Some(dialog_text) = feedback.dialog_text(&request.text).map(str::to_owned) else {
            #[cfg(feature = "prometheus")]
            masdif_prometheus::record_feedback(false);
            let elements = reply::empty_response(
                resolved.empty_reply_metadata(),
                &message.id,
                conversation_id,
            );
            return self.finish(message, elements, &resolved, started).await;
        };
        #[cfg(feature = "prometheus")]
        {
            if matches!(feedback, crate::feedback::FeedbackOutcome::Accepted { .. }) {
                masdif_prometheus::record_feedback(true);
            }
        }

        // Events newer than this belong to the current turn.
        let cursor = self
            .dialog
            .tracker(conversation_id)
            .await
            .tracker()
            .and_then(|t| t.latest_event_time)
            .unwrap_or(0.0);

        let dialog_started = Instant::now();
        let response = self
            .dialog
            .send_message(conversation_id, &dialog_text, &resolved.meta)
            .await;
        message.time_dialog = Some(dialog_started.elapsed().as_secs_f64());

        if !response.is_success() {
            error!(
                conversation_id,
                message_id = %message.id,
                status = response.status,
                reason = %response.reason,
                "dialog engine call failed"
            );
            message.reply = Value::String(response.reason.clone());
            message.time_overall = Some(started.elapsed().as_secs_f64());
            self.storage.update_message(&message).await?;
            return Err(MasdifError::Dialog {
                status: response.status,
                reason: response.reason,
            });
        }

        let mut elements = reply::normalize(response.body);
        if let Some(action_reply) = reply::extract_custom(&mut elements) {
            message.action_reply = Some(action_reply);
        }

        let elements = if elements.is_empty() {
            debug!(conversation_id, message_id = %message.id, "empty dialog reply");
            reply::empty_response(resolved.empty_reply_metadata(), &message.id, conversation_id)
        } else {
            let tts_started = Instant::now();
            if resolved.use_tts {
                self.attach_speech(&mut message, &mut elements, &resolved)
                    .await;
            }
            message.time_tts = Some(tts_started.elapsed().as_secs_f64());
            reply::append_correlation(
                &mut elements,
                &resolved.reply_metadata(),
                &message.id,
                conversation_id,
            );
            elements
        };

        self.record_tracker(&mut message, cursor).await;
        self.finish(message, elements, &resolved, started).await
    }

    /// Stores NLU result and this turn's events from a fresh tracker.
    async fn record_tracker(&self, message: &mut Message, cursor: f64) {
        let Some(tracker) = self
            .dialog
            .tracker(&message.conversation_id)
            .await
            .tracker()
        else {
            warn!(
                conversation_id = %message.conversation_id,
                message_id = %message.id,
                "tracker unavailable, events not recorded"
            );
            return;
        };
        message.nlu = tracker
            .latest_message
            .as_ref()
            .map(|m| reply::filter_keys(m, reply::NLU_FILTER_KEYS));
        message.events = reply::events_after(&tracker.events, cursor)
            .iter()
            .map(|e| reply::filter_keys(e, reply::EVENT_FILTER_KEYS))
            .collect();
    }

    /// Synthesizes the reply text and links the audio from the first element.
    ///
    /// Failures only mark the message; the reply is sent either way.
    async fn attach_speech(
        &self,
        message: &mut Message,
        elements: &mut [Value],
        resolved: &ResolvedMetadata,
    ) {
        let Some(tts) = self.speech() else {
            return;
        };
        let text = reply::speech_text(elements);
        if text.is_empty() {
            debug!(message_id = %message.id, "no reply text to synthesize");
            return;
        }

        let outcome = match tts
            .synthesize(&text, &resolved.language, resolved.voice.as_deref())
            .await
        {
            Ok(audio) => self.store_audio(message, &text, &resolved.language, audio).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(src) => {
                if let Some(first) = elements.first_mut() {
                    reply::attach_audio(first, &src);
                }
                message.tts_result = TtsResult::Success;
            }
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "speech synthesis failed");
                message.tts_result = TtsResult::Error;
            }
        }
        #[cfg(feature = "prometheus")]
        masdif_prometheus::record_tts_result(&message.tts_result.to_string());
    }

    /// Stores synthesized audio as an attachment, schedules its purge, and
    /// returns the public URL.
    async fn store_audio(
        &self,
        message: &Message,
        text: &str,
        language: &str,
        audio: SynthesizedAudio,
    ) -> Result<String, MasdifError> {
        let extension = extension_for(&self.config.tts.output_format);
        let file_name = audio_file_name(text, language, &audio.voice, &message.id, extension);
        let attachment = Attachment {
            file_name: file_name.clone(),
            message_id: message.id.clone(),
            kind: AttachmentKind::TtsAudio,
            content_type: audio.content_type,
            data: audio.data,
            created_at: now_timestamp(),
        };
        self.storage.insert_attachment(&attachment).await?;

        let delay = Duration::from_secs(self.config.tts.attachment_timeout_secs);
        if let Err(e) = self
            .scheduler
            .schedule_purge(&message.id, AttachmentKind::TtsAudio, delay)
            .await
        {
            warn!(message_id = %message.id, error = %e, "failed to schedule attachment purge");
        }

        Ok(format!(
            "{}/attachments/{}",
            self.config.server.public_url.trim_end_matches('/'),
            file_name
        ))
    }

    /// Persists the final state of the message and returns the reply body.
    async fn finish(
        &self,
        mut message: Message,
        elements: Vec<Value>,
        resolved: &ResolvedMetadata,
        started: Instant,
    ) -> Result<Value, MasdifError> {
        // Infallible for `Value` elements; any failure falls back to the empty response.
        let body = match serde_json::to_string(&elements) {
            Ok(_) => Value::Array(elements),
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "reply not serializable, sending empty response");
                Value::Array(reply::empty_response(
                    resolved.empty_reply_metadata(),
                    &message.id,
                    &message.conversation_id,
                ))
            }
        };

        message.reply = body.clone();
        message.time_overall = Some(started.elapsed().as_secs_f64());
        self.storage.update_message(&message).await?;

        info!(
            conversation_id = %message.conversation_id,
            message_id = %message.id,
            tts_result = %message.tts_result,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "turn completed"
        );
        #[cfg(feature = "prometheus")]
        {
            masdif_prometheus::record_turn("ok");
            masdif_prometheus::record_timings(
                message.time_dialog,
                message.time_tts,
                message.time_overall,
            );
        }
        Ok(body)
    }

    /// Wipes the dialog engine tracker and deletes the conversation locally.
    ///
    /// The local delete happens regardless of the upstream answer.
    pub async fn delete_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<DeleteOutcome, MasdifError> {
        if self.storage.get_conversation(conversation_id).await?.is_none() {
            return Err(conversation_not_found());
        }

        let response = self.dialog.replace_events(conversation_id, &[]).await;
        self.storage.delete_conversation(conversation_id).await?;
        #[cfg(feature = "prometheus")]
        masdif_prometheus::record_conversation("deleted");

        let cleared = response.is_success()
            && response
                .body
                .get("events")
                .and_then(Value::as_array)
                .is_some_and(Vec::is_empty);
        if cleared {
            info!(conversation_id, "conversation deleted");
            Ok(DeleteOutcome::Deleted)
        } else {
            warn!(
                conversation_id,
                status = response.status,
                "conversation deleted locally but dialog engine did not confirm"
            );
            Ok(DeleteOutcome::UpstreamNotCleared)
        }
    }

    pub async fn conversation_history(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationHistory, MasdifError> {
        if self.storage.get_conversation(conversation_id).await?.is_none() {
            return Err(conversation_not_found());
        }
        let messages = self.storage.get_messages(conversation_id).await?;
        Ok(ConversationHistory {
            conversation_id: conversation_id.to_string(),
            messages,
        })
    }

    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, MasdifError> {
        self.storage.list_conversations().await
    }

    /// User-facing messages of a conversation, without control messages.
    pub async fn excerpts(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageExcerpt>, MasdifError> {
        if self.storage.get_conversation(conversation_id).await?.is_none() {
            return Err(conversation_not_found());
        }
        self.storage.list_excerpts(conversation_id).await
    }

    /// Supported languages and MOTD for a conversation.
    pub async fn info(
        &self,
        conversation_id: &str,
        language: Option<&str>,
    ) -> Result<InfoResponse, MasdifError> {
        if self.storage.get_conversation(conversation_id).await?.is_none() {
            return Err(conversation_not_found());
        }
        motd::info(
            self.dialog.as_ref(),
            &self.config.motd,
            &self.config.languages,
            conversation_id,
            language,
        )
        .await
    }

    pub async fn attachment(&self, file_name: &str) -> Result<Attachment, MasdifError> {
        self.storage
            .get_attachment(file_name)
            .await?
            .ok_or_else(|| MasdifError::NotFound("Attachment not found".into()))
    }
}
