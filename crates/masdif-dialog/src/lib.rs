// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rasa dialog engine adapter for the Masdif gateway.
//!
//! Implements [`DialogEngine`] on top of the Rasa HTTP API.

pub mod client;

use std::time::Duration;

use async_trait::async_trait;
use masdif_config::model::DialogConfig;
use masdif_core::{
    AdapterType, DialogEngine, DialogEvent, DialogResponse, HealthStatus, InputMetadata,
    MasdifError, PluginAdapter,
};
use serde_json::Value;
use tracing::{debug, info};

pub use crate::client::RasaClient;

/// [`DialogEngine`] backed by a Rasa server.
pub struct RasaDialogEngine {
    client: RasaClient,
}

impl RasaDialogEngine {
    pub fn new(config: &DialogConfig) -> Result<Self, MasdifError> {
        let client = RasaClient::new(
            &config.url,
            &config.base_path,
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(url = %config.url, base_path = %config.base_path, "Rasa dialog engine configured");
        Ok(Self { client })
    }

    pub fn with_client(client: RasaClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RasaClient {
        &self.client
    }
}

fn metadata_value(metadata: &InputMetadata) -> Value {
    serde_json::to_value(metadata).unwrap_or(Value::Object(Default::default()))
}

#[async_trait]
impl PluginAdapter for RasaDialogEngine {
    fn name(&self) -> &str {
        "rasa"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DialogEngine
    }

    async fn health_check(&self) -> Result<HealthStatus, MasdifError> {
        let resp = self.client.health().await;
        if resp.is_success() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy(format!(
                "{} {}",
                resp.status, resp.reason
            )))
        }
    }

    async fn shutdown(&self) -> Result<(), MasdifError> {
        debug!("Rasa dialog engine shutting down");
        Ok(())
    }
}

#[async_trait]
impl DialogEngine for RasaDialogEngine {
    async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        metadata: &InputMetadata,
    ) -> DialogResponse {
        self.client
            .rest_message(conversation_id, text, metadata_value(metadata))
            .await
    }

    async fn tracker(&self, conversation_id: &str) -> DialogResponse {
        self.client.get_tracker(conversation_id).await
    }

    async fn add_event(
        &self,
        conversation_id: &str,
        event: &DialogEvent,
        metadata: &InputMetadata,
    ) -> DialogResponse {
        let text = match event {
            DialogEvent::User { text } | DialogEvent::Other { text, .. } => Some(text.as_str()),
            DialogEvent::Restart => None,
        };
        if let DialogEvent::Other { name, .. } = event {
            tracing::warn!(event = %name, "appending non-standard event type");
        }
        self.client
            .add_event(conversation_id, event.name(), text, metadata_value(metadata))
            .await
    }

    async fn replace_events(&self, conversation_id: &str, events: &[Value]) -> DialogResponse {
        self.client.replace_events(conversation_id, events).await
    }

    async fn trigger_intent(
        &self,
        conversation_id: &str,
        intent: &str,
        entities: &Value,
    ) -> DialogResponse {
        self.client
            .trigger_intent(conversation_id, intent, entities)
            .await
    }
}
