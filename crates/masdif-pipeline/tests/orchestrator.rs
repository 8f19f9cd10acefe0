// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestration against mock collaborators and a temp SQLite database.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use masdif_config::model::MasdifConfig;
use masdif_core::{
    AttachmentKind, DialogEngine, Feedback, InputMetadata, MasdifError, StorageAdapter, TtsResult,
};
use masdif_pipeline::{DeleteOutcome, TurnOrchestrator, TurnRequest};
use masdif_test_utils::{DialogCall, TestHarness};

fn orchestrator(h: &TestHarness) -> TurnOrchestrator {
    TurnOrchestrator::new(
        Arc::new(h.config.clone()),
        h.storage.clone(),
        h.dialog.clone(),
        h.scheduler.clone(),
    )
    .with_tts(h.tts.clone())
}

fn text(t: &str) -> TurnRequest {
    TurnRequest {
        text: t.to_string(),
        ..TurnRequest::default()
    }
}

fn feedback(value: &str, message_id: &str) -> TurnRequest {
    TurnRequest {
        text: format!(r#"/feedback{{"value": "{value}"}}"#),
        message_id: Some(message_id.to_string()),
        metadata: None,
    }
}

fn message_id(reply: &Value) -> String {
    reply[0]["message_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn create_conversation_stores_bootstrap_message() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);

    let id = orch.create_conversation().await.unwrap();

    let conv = h.storage.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(conv.status, "new");
    assert_eq!(conv.masdif_version.as_deref(), Some(orch.version()));

    let messages = h.storage.get_messages(&id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "/restart");
    assert!(messages[0].reply.get("events").is_some());
    assert!(h.dialog.calls().await.contains(&DialogCall::AddEvent {
        conversation_id: id.clone(),
        event: "restart".into(),
    }));
}

#[tokio::test]
async fn create_conversation_persists_row_when_dialog_rejects() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    h.dialog.set_failure(Some((500, "Internal Server Error"))).await;

    let err = orch.create_conversation().await.unwrap_err();
    assert!(matches!(err, MasdifError::Dialog { status: 500, .. }));

    let conversations = h.storage.list_conversations().await.unwrap();
    assert_eq!(conversations.len(), 1);
    let messages = h.storage.get_messages(&conversations[0].id).await.unwrap();
    assert_eq!(messages[0].reply, json!("Internal Server Error"));
}

#[tokio::test]
async fn turn_reply_carries_correlation_and_audio() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();
    h.dialog
        .push_reply(json!([
            {"recipient_id": conv, "text": "Halló!"},
            {"recipient_id": conv, "text": "Hvað get ég gert?", "buttons": []}
        ]))
        .await;

    let reply = orch.handle_turn(&conv, text("hæ")).await.unwrap();
    let elements = reply.as_array().unwrap();
    assert_eq!(elements.len(), 2);
    for element in elements {
        assert_eq!(element["recipient_id"], json!(conv));
        assert!(!element["message_id"].as_str().unwrap().is_empty());
        assert_eq!(element["metadata"]["language"], "is-IS");
        assert_eq!(element["metadata"]["tts"], true);
    }
    let src = elements[0]["data"]["attachment"][0]["payload"]["src"]
        .as_str()
        .unwrap();
    assert!(src.starts_with("http://localhost:8080/attachments/"));
    assert!(src.ends_with(".mp3"));
    assert!(elements[1].get("data").is_none());

    let calls = h.tts.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "Halló! Hvað get ég gert?");
    assert_eq!(calls[0].1, "is-IS");

    let mid = message_id(&reply);
    let stored = h.storage.get_message(&conv, &mid).await.unwrap().unwrap();
    assert_eq!(stored.tts_result, TtsResult::Success);
    assert!(stored.time_dialog.is_some());
    assert!(stored.time_tts.is_some());
    assert!(stored.time_overall.is_some());
    assert_eq!(stored.reply, reply);

    let file = src.rsplit('/').next().unwrap();
    let attachment = orch.attachment(file).await.unwrap();
    assert_eq!(attachment.message_id, mid);
    assert_eq!(attachment.content_type, "audio/mpeg");

    let scheduled = h.scheduler.scheduled().await;
    assert_eq!(
        scheduled,
        vec![(mid, AttachmentKind::TtsAudio, Duration::from_secs(60))]
    );
}

#[tokio::test]
async fn tts_disabled_means_no_audio() {
    let mut config = MasdifConfig::default();
    config.tts.enabled = false;
    let h = TestHarness::with_config(config).await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();

    let reply = orch.handle_turn(&conv, text("hæ")).await.unwrap();
    assert!(reply[0].get("data").is_none());
    assert_eq!(reply[0]["metadata"]["tts"], false);
    assert!(h.tts.calls().await.is_empty());

    let stored = h
        .storage
        .get_message(&conv, &message_id(&reply))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.tts_result, TtsResult::Disabled);
}

#[tokio::test]
async fn tts_failure_does_not_block_reply() {
    let h = TestHarness::new().await.unwrap();
    h.tts.set_failing(true);
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();

    let reply = orch.handle_turn(&conv, text("hæ")).await.unwrap();
    assert_eq!(reply[0]["text"], "echo: hæ");
    assert!(reply[0].get("data").is_none());

    let stored = h
        .storage
        .get_message(&conv, &message_id(&reply))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.tts_result, TtsResult::Error);
    assert!(h.scheduler.scheduled().await.is_empty());
}

#[tokio::test]
async fn empty_dialog_reply_yields_canonical_shape() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();
    h.dialog.push_reply(json!([])).await;

    let request = TurnRequest {
        text: "...".into(),
        message_id: None,
        metadata: Some(InputMetadata {
            asr_generated: Some(true),
            ..InputMetadata::default()
        }),
    };
    let reply = orch.handle_turn(&conv, request).await.unwrap();
    let elements = reply.as_array().unwrap();
    assert_eq!(elements.len(), 1);
    let element = elements[0].as_object().unwrap();
    let mut keys: Vec<_> = element.keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["message_id", "metadata", "recipient_id"]);
    assert_eq!(element["metadata"]["tts"], false);
    assert_eq!(element["metadata"]["asr_generated"], false);
    assert_eq!(element["recipient_id"], json!(conv));
    assert!(h.tts.calls().await.is_empty());
}

#[tokio::test]
async fn custom_elements_become_action_reply() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();
    h.dialog
        .push_reply(json!([
            {"text": "Opna síðu"},
            {"custom": "{\"actionType\": \"openUrl\", \"targetUrl\": \"https://example.is\"}"}
        ]))
        .await;

    let reply = orch.handle_turn(&conv, text("opna")).await.unwrap();
    assert_eq!(reply.as_array().unwrap().len(), 1);
    assert!(reply[0].get("custom").is_none());

    let stored = h
        .storage
        .get_message(&conv, &message_id(&reply))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.action_reply,
        Some(json!({"action_type": "openUrl", "target_url": "https://example.is"}))
    );
}

#[tokio::test]
async fn dialog_failure_persists_reason() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();
    h.dialog.set_failure(Some((504, "Gateway Timeout"))).await;

    let err = orch.handle_turn(&conv, text("hæ")).await.unwrap_err();
    assert!(matches!(err, MasdifError::Dialog { status: 504, ref reason } if reason == "Gateway Timeout"));

    let messages = h.storage.get_messages(&conv).await.unwrap();
    let last = messages.last().unwrap();
    assert_eq!(last.text, "hæ");
    assert_eq!(last.reply, json!("Gateway Timeout"));
    let sends = h
        .dialog
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, DialogCall::SendMessage { .. }))
        .count();
    assert_eq!(sends, 1);
}

#[tokio::test]
async fn events_are_limited_to_the_current_turn_and_filtered() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();

    orch.handle_turn(&conv, text("fyrst")).await.unwrap();
    let reply = orch.handle_turn(&conv, text("svo")).await.unwrap();

    let stored = h
        .storage
        .get_message(&conv, &message_id(&reply))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.events.len(), 2);
    assert_eq!(stored.events[0]["event"], "user");
    assert_eq!(stored.events[0]["text"], "svo");
    for event in &stored.events {
        for key in ["parse_data", "metadata", "custom", "message_id", "timestamp"] {
            assert!(event.get(key).is_none(), "{key} should be filtered");
        }
    }
    let nlu = stored.nlu.unwrap();
    assert_eq!(nlu["text"], "svo");
    assert!(nlu.get("metadata").is_none());
    assert!(nlu.get("message_id").is_none());
}

#[tokio::test]
async fn tracker_failure_still_answers() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();
    h.dialog.set_tracker_failure(true).await;

    let reply = orch.handle_turn(&conv, text("hæ")).await.unwrap();
    assert_eq!(reply[0]["text"], "echo: hæ");
    let stored = h
        .storage
        .get_message(&conv, &message_id(&reply))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.events.is_empty());
    assert!(stored.nlu.is_none());
}

#[tokio::test]
async fn feedback_is_last_write_wins() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();
    let reply = orch.handle_turn(&conv, text("hæ")).await.unwrap();
    let target = message_id(&reply);

    let ack = orch
        .handle_turn(&conv, feedback("positive", &target))
        .await
        .unwrap();
    assert_eq!(ack.as_array().unwrap().len(), 1);
    assert_eq!(ack[0]["metadata"]["tts"], false);
    assert_ne!(ack[0]["message_id"], json!(target));

    orch.handle_turn(&conv, feedback("negative", &target))
        .await
        .unwrap();
    let stored = h.storage.get_message(&conv, &target).await.unwrap().unwrap();
    assert_eq!(stored.feedback, Feedback::Negative);
}

#[tokio::test]
async fn feedback_for_unknown_message_mutates_nothing() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();
    let before = h.storage.get_messages(&conv).await.unwrap();

    let err = orch
        .handle_turn(&conv, feedback("positive", "no-such-message"))
        .await
        .unwrap_err();
    assert!(matches!(err, MasdifError::NotFound(ref m) if m == "Message not found: no-such-message"));

    let after = h.storage.get_messages(&conv).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn feedback_without_message_id_is_bad_request() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();

    let err = orch
        .handle_turn(&conv, text(r#"/feedback{"value": "positive"}"#))
        .await
        .unwrap_err();
    assert!(matches!(err, MasdifError::BadRequest(ref m) if m == "Missing message_id"));

    let err = orch
        .handle_turn(&conv, text("/feedback{oops"))
        .await
        .unwrap_err();
    assert!(matches!(err, MasdifError::BadRequest(ref m) if m == "Malformed feedback value detected"));

    let stray = TurnRequest {
        text: "hæ".into(),
        message_id: Some("m".into()),
        metadata: None,
    };
    let err = orch.handle_turn(&conv, stray).await.unwrap_err();
    assert!(matches!(err, MasdifError::BadRequest(ref m) if m == "message_id provided without feedback value"));
}

#[tokio::test]
async fn forwarded_feedback_includes_reply_text() {
    let mut config = MasdifConfig::default();
    config.tts.enabled = true;
    config.feedback.forward = true;
    config.feedback.intent = Some("user_feedback".into());
    config.feedback.include_reply_text = true;
    let h = TestHarness::with_config(config).await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();

    h.dialog
        .push_reply(json!([{"text": "Já"}, {"text": "Nei"}]))
        .await;
    let reply = orch.handle_turn(&conv, text("spurning")).await.unwrap();
    let target = message_id(&reply);

    orch.handle_turn(&conv, feedback("positive", &target))
        .await
        .unwrap();

    let sent: Vec<String> = h
        .dialog
        .calls()
        .await
        .into_iter()
        .filter_map(|c| match c {
            DialogCall::SendMessage { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(
        sent.last().unwrap(),
        r#"/user_feedback{"value": "positive", "text": "Já.Nei"}"#
    );
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let err = orch.handle_turn("nope", text("hæ")).await.unwrap_err();
    assert!(matches!(err, MasdifError::NotFound(_)));
}

#[tokio::test]
async fn unsupported_language_is_rejected_before_any_side_effect() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();
    let request = TurnRequest {
        text: "bonjour".into(),
        message_id: None,
        metadata: Some(InputMetadata {
            language: Some("fr-FR".into()),
            ..InputMetadata::default()
        }),
    };
    let err = orch.handle_turn(&conv, request).await.unwrap_err();
    assert!(matches!(err, MasdifError::BadRequest(ref m) if m == "Unsupported language"));
    assert_eq!(h.storage.get_messages(&conv).await.unwrap().len(), 1);
}

#[tokio::test]
async fn restart_after_create_reuses_the_conversation() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();

    orch.handle_turn(&conv, text("/restart")).await.unwrap();
    orch.handle_turn(&conv, text("/restart")).await.unwrap();

    assert_eq!(h.storage.list_conversations().await.unwrap().len(), 1);
    // Replays are new turns.
    assert_eq!(h.storage.get_messages(&conv).await.unwrap().len(), 3);
}

#[tokio::test]
async fn delete_wipes_local_and_upstream() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();
    orch.handle_turn(&conv, text("hæ")).await.unwrap();

    assert_eq!(orch.delete_conversation(&conv).await.unwrap(), DeleteOutcome::Deleted);
    assert!(h.dialog.events(&conv).await.is_empty());
    assert!(matches!(
        orch.conversation_history(&conv).await.unwrap_err(),
        MasdifError::NotFound(_)
    ));
    assert!(matches!(
        orch.handle_turn(&conv, text("hæ")).await.unwrap_err(),
        MasdifError::NotFound(_)
    ));
}

#[tokio::test]
async fn delete_reports_unconfirmed_upstream() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();
    h.dialog.set_keep_events_on_replace(true).await;

    let outcome = orch.delete_conversation(&conv).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::UpstreamNotCleared);
    assert!(h.storage.get_conversation(&conv).await.unwrap().is_none());
}

#[tokio::test]
async fn history_and_excerpts() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();
    orch.handle_turn(&conv, text("hæ")).await.unwrap();

    let history = orch.conversation_history(&conv).await.unwrap();
    assert_eq!(history.conversation_id, conv);
    assert_eq!(history.messages.len(), 2);

    let excerpts = orch.excerpts(&conv).await.unwrap();
    assert_eq!(excerpts.len(), 1);
    assert_eq!(excerpts[0].text, "hæ");
}

#[tokio::test]
async fn info_uses_dialog_motd_or_default() {
    let mut config = MasdifConfig::default();
    config.motd.intent = Some("motd".into());
    config
        .motd
        .default
        .insert("is-IS".into(), vec!["Sjálfgefið".into()]);
    let h = TestHarness::with_config(config).await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();

    let inner = json!({"motd": {"motd": ["Góðan dag"], "language": "is-IS"}}).to_string();
    h.dialog
        .push_intent_reply(json!({"messages": [{"text": inner}]}))
        .await;
    let info = orch.info(&conv, Some("is-IS")).await.unwrap();
    assert_eq!(info.motd, vec!["Góðan dag".to_string()]);
    assert_eq!(info.supported_languages.len(), 2);

    let fallback = orch.info(&conv, None).await.unwrap();
    assert_eq!(fallback.motd, vec!["Sjálfgefið".to_string()]);

    let err = orch.info(&conv, Some("de-DE")).await.unwrap_err();
    assert!(matches!(err, MasdifError::NotFound(ref m) if m == "Unsupported language"));
}

#[tokio::test]
async fn info_without_motd_intent_is_config_error() {
    let h = TestHarness::new().await.unwrap();
    let orch = orchestrator(&h);
    let conv = orch.create_conversation().await.unwrap();
    let err = orch.info(&conv, None).await.unwrap_err();
    assert!(matches!(err, MasdifError::Config(_)));
}

#[tokio::test]
async fn trait_objects_are_usable() {
    let h = TestHarness::new().await.unwrap();
    let dialog: Arc<dyn DialogEngine> = h.dialog.clone();
    let storage: Arc<dyn StorageAdapter> = h.storage.clone();
    assert!(dialog.health_check().await.unwrap().is_up());
    assert!(storage.health_check().await.unwrap().is_up());
}
