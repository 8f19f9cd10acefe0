// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialog engine adapter trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::traits::adapter::PluginAdapter;
use crate::types::{DialogEvent, DialogResponse, InputMetadata};

/// Client for an external dialog engine.
///
/// None of these methods fail: transport errors and timeouts are folded into
/// a [`DialogResponse`] with a non-success status so callers handle every
/// upstream outcome in one place.
#[async_trait]
pub trait DialogEngine: PluginAdapter {
    /// Posts a user utterance and returns the bot reply elements.
    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        metadata: &InputMetadata,
    ) -> DialogResponse;

    /// Fetches the conversation tracker.
    async fn tracker(&self, conversation_id: &str) -> DialogResponse;

    /// Appends a single event to the tracker.
    async fn add_event(
        &self,
        conversation_id: &str,
        event: &DialogEvent,
        metadata: &InputMetadata,
    ) -> DialogResponse;

    /// Replaces all tracker events. An empty slice wipes the conversation.
    async fn replace_events(&self, conversation_id: &str, events: &[Value]) -> DialogResponse;

    /// Triggers an intent with the given entities.
    async fn trigger_intent(
        &self,
        conversation_id: &str,
        intent: &str,
        entities: &Value,
    ) -> DialogResponse;
}
