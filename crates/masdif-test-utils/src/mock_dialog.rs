// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock dialog engine with an in-memory tracker.
//!
//! Each conversation gets an event list with monotonically increasing
//! timestamps, so tracker-cursor logic can be exercised without Rasa.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use masdif_core::{
    AdapterType, DialogEngine, DialogEvent, DialogResponse, HealthStatus, InputMetadata,
    MasdifError, PluginAdapter,
};

/// One recorded call against the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogCall {
    SendMessage { conversation_id: String, text: String },
    Tracker { conversation_id: String },
    AddEvent { conversation_id: String, event: String },
    ReplaceEvents { conversation_id: String, count: usize },
    TriggerIntent { conversation_id: String, intent: String },
}

#[derive(Default)]
struct State {
    clock: f64,
    trackers: HashMap<String, Vec<Value>>,
    replies: VecDeque<Value>,
    intent_replies: VecDeque<Value>,
    failure: Option<(u16, String)>,
    tracker_failure: bool,
    keep_events_on_replace: bool,
    calls: Vec<DialogCall>,
}

impl State {
    fn tick(&mut self) -> f64 {
        self.clock += 1.0;
        self.clock
    }

    fn push_event(&mut self, conversation_id: &str, mut event: Value) {
        let ts = self.tick();
        event["timestamp"] = json!(ts);
        self.trackers
            .entry(conversation_id.to_string())
            .or_default()
            .push(event);
    }
}

/// Scripted [`DialogEngine`].
///
/// Replies to `send_message` are popped from a queue; when it is empty the
/// engine answers with a single text element echoing the input.
#[derive(Default)]
pub struct MockDialogEngine {
    state: Mutex<State>,
}

impl MockDialogEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the JSON body returned by the next `send_message`.
    pub async fn push_reply(&self, body: Value) {
        self.state.lock().await.replies.push_back(body);
    }

    /// Queues the JSON body returned by the next `trigger_intent`.
    pub async fn push_intent_reply(&self, body: Value) {
        self.state.lock().await.intent_replies.push_back(body);
    }

    /// Makes every call answer with `status`/`reason` until cleared with `None`.
    pub async fn set_failure(&self, failure: Option<(u16, &str)>) {
        self.state.lock().await.failure = failure.map(|(s, r)| (s, r.to_string()));
    }

    /// Makes only tracker fetches fail.
    pub async fn set_tracker_failure(&self, fail: bool) {
        self.state.lock().await.tracker_failure = fail;
    }

    /// Makes `replace_events` report success without clearing anything.
    pub async fn set_keep_events_on_replace(&self, keep: bool) {
        self.state.lock().await.keep_events_on_replace = keep;
    }

    pub async fn calls(&self) -> Vec<DialogCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn events(&self, conversation_id: &str) -> Vec<Value> {
        self.state
            .lock()
            .await
            .trackers
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }
}

fn ok(body: Value) -> DialogResponse {
    DialogResponse {
        status: 200,
        reason: "OK".into(),
        body,
    }
}

fn failed(failure: &(u16, String)) -> DialogResponse {
    DialogResponse {
        status: failure.0,
        reason: failure.1.clone(),
        body: Value::Null,
    }
}

#[async_trait]
impl PluginAdapter for MockDialogEngine {
    fn name(&self) -> &str {
        "mock-dialog"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DialogEngine
    }

    async fn health_check(&self) -> Result<HealthStatus, MasdifError> {
        match &self.state.lock().await.failure {
            Some((status, reason)) => Ok(HealthStatus::Unhealthy(format!("{status} {reason}"))),
            None => Ok(HealthStatus::Healthy),
        }
    }

    async fn shutdown(&self) -> Result<(), MasdifError> {
        Ok(())
    }
}

#[async_trait]
impl DialogEngine for MockDialogEngine {
    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        metadata: &InputMetadata,
    ) -> DialogResponse {
        let mut state = self.state.lock().await;
        state.calls.push(DialogCall::SendMessage {
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
        });
        if let Some(failure) = &state.failure {
            return failed(failure);
        }

        let meta = serde_json::to_value(metadata).unwrap_or(Value::Null);
        state.push_event(
            conversation_id,
            json!({
                "event": "user",
                "text": text,
                "parse_data": {"intent": {"name": "mock_intent", "confidence": 1.0}},
                "metadata": meta,
                "message_id": "rasa-msg-1",
            }),
        );

        let reply = state
            .replies
            .pop_front()
            .unwrap_or_else(|| json!([{"recipient_id": conversation_id, "text": format!("echo: {text}")}]));
        state.push_event(
            conversation_id,
            json!({"event": "bot", "text": reply.get(0).and_then(|r| r.get("text")).cloned(), "metadata": {}}),
        );
        ok(reply)
    }

    async fn tracker(&self, conversation_id: &str) -> DialogResponse {
        let mut state = self.state.lock().await;
        state.calls.push(DialogCall::Tracker {
            conversation_id: conversation_id.to_string(),
        });
        if let Some(failure) = &state.failure {
            return failed(failure);
        }
        if state.tracker_failure {
            return failed(&(500, "Internal Server Error".to_string()));
        }

        let events = state
            .trackers
            .get(conversation_id)
            .cloned()
            .unwrap_or_default();
        let latest_event_time = events
            .last()
            .and_then(|e| e.get("timestamp"))
            .cloned()
            .unwrap_or(Value::Null);
        let latest_message = events
            .iter()
            .rev()
            .find(|e| e["event"] == "user")
            .map(|e| {
                json!({
                    "intent": e["parse_data"]["intent"],
                    "text": e["text"],
                    "metadata": e["metadata"],
                    "message_id": e["message_id"],
                })
            })
            .unwrap_or(Value::Null);
        ok(json!({
            "sender_id": conversation_id,
            "latest_event_time": latest_event_time,
            "latest_message": latest_message,
            "events": events,
        }))
    }

    async fn add_event(
        &self,
        conversation_id: &str,
        event: &DialogEvent,
        metadata: &InputMetadata,
    ) -> DialogResponse {
        let mut state = self.state.lock().await;
        state.calls.push(DialogCall::AddEvent {
            conversation_id: conversation_id.to_string(),
            event: event.name().to_string(),
        });
        if let Some(failure) = &state.failure {
            return failed(failure);
        }
        let meta = serde_json::to_value(metadata).unwrap_or(Value::Null);
        state.push_event(conversation_id, json!({"event": event.name(), "metadata": meta}));
        let events = state.trackers.get(conversation_id).cloned().unwrap_or_default();
        ok(json!({"sender_id": conversation_id, "events": events}))
    }

    async fn replace_events(&self, conversation_id: &str, events: &[Value]) -> DialogResponse {
        let mut state = self.state.lock().await;
        state.calls.push(DialogCall::ReplaceEvents {
            conversation_id: conversation_id.to_string(),
            count: events.len(),
        });
        if let Some(failure) = &state.failure {
            return failed(failure);
        }
        if !state.keep_events_on_replace {
            state
                .trackers
                .insert(conversation_id.to_string(), events.to_vec());
        }
        let current = state.trackers.get(conversation_id).cloned().unwrap_or_default();
        ok(json!({"sender_id": conversation_id, "events": current}))
    }

    async fn trigger_intent(
        &self,
        conversation_id: &str,
        intent: &str,
        _entities: &Value,
    ) -> DialogResponse {
        let mut state = self.state.lock().await;
        state.calls.push(DialogCall::TriggerIntent {
            conversation_id: conversation_id.to_string(),
            intent: intent.to_string(),
        });
        if let Some(failure) = &state.failure {
            return failed(failure);
        }
        ok(state
            .intent_replies
            .pop_front()
            .unwrap_or_else(|| json!({"messages": []})))
    }
}
