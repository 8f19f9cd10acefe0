// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for the Masdif gateway.
//!
//! Installs the metrics-rs Prometheus recorder and renders the text
//! exposition format served at `/metrics`.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use masdif_core::{AdapterType, HealthStatus, MasdifError, PluginAdapter};

pub use recording::{
    record_attachments_purged, record_conversation, record_feedback, record_timings,
    record_tts_result, record_turn,
};

pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Installs the Prometheus recorder globally.
    ///
    /// Only one recorder can exist per process; a second call fails.
    pub fn new() -> Result<Self, MasdifError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            MasdifError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Renders all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, MasdifError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MasdifError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The recorder is process-global, so one test covers install and render.
    #[tokio::test]
    async fn installs_once_and_renders_recorded_metrics() {
        let adapter = PrometheusAdapter::new().expect("first install succeeds");
        assert!(PrometheusAdapter::new().is_err());

        record_turn("ok");
        record_timings(Some(0.2), None, Some(0.3));

        let text = adapter.render();
        assert!(text.contains("masdif_turns_total"), "got: {text}");
        assert!(text.contains("masdif_turn_seconds"));
        assert_eq!(adapter.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
