// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregate health of the gateway and its collaborators.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use masdif_core::{
    DialogEngine, HealthStatus, MasdifError, PluginAdapter, SpeechSynthesizer, StorageAdapter,
};

use crate::cleanup::JobsMonitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComponentStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "DOWN")]
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverallStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "UNHEALTHY")]
    Unhealthy,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub database: ComponentStatus,
    pub dialog_system: ComponentStatus,
    pub tts: ComponentStatus,
    pub jobs: ComponentStatus,
    pub masdif: OverallStatus,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.masdif == OverallStatus::Ok
    }

    fn components(&self) -> [(&'static str, ComponentStatus); 4] {
        [
            ("database", self.database),
            ("dialog_system", self.dialog_system),
            ("tts", self.tts),
            ("jobs", self.jobs),
        ]
    }

    /// `(name, status)` pairs for display.
    pub fn entries(&self) -> Vec<(&'static str, &'static str)> {
        self.components()
            .into_iter()
            .map(|(name, s)| (name, if s == ComponentStatus::Ok { "OK" } else { "DOWN" }))
            .collect()
    }
}

/// Runs every subsystem probe and folds them into a [`HealthReport`].
pub struct HealthChecker {
    storage: Arc<dyn StorageAdapter>,
    dialog: Arc<dyn DialogEngine>,
    /// `None` when speech synthesis is disabled; reported as OK.
    tts: Option<Arc<dyn SpeechSynthesizer>>,
    /// `None` when no job runner is expected, e.g. for one-shot checks.
    jobs: Option<(Arc<JobsMonitor>, Duration)>,
}

impl HealthChecker {
    pub fn new(storage: Arc<dyn StorageAdapter>, dialog: Arc<dyn DialogEngine>) -> Self {
        Self {
            storage,
            dialog,
            tts: None,
            jobs: None,
        }
    }

    pub fn with_tts(mut self, tts: Arc<dyn SpeechSynthesizer>) -> Self {
        self.tts = Some(tts);
        self
    }

    /// Requires the job runner to have polled within `max_age`.
    pub fn with_jobs(mut self, monitor: Arc<JobsMonitor>, max_age: Duration) -> Self {
        self.jobs = Some((monitor, max_age));
        self
    }

    pub async fn check(&self) -> HealthReport {
        let (database, dialog_system, tts) = tokio::join!(
            probe(self.storage.as_ref()),
            probe(self.dialog.as_ref()),
            async {
                match &self.tts {
                    Some(tts) => probe(tts.as_ref()).await,
                    None => ComponentStatus::Ok,
                }
            }
        );
        let jobs = match &self.jobs {
            Some((monitor, max_age)) if !monitor.is_alive(*max_age) => ComponentStatus::Down,
            _ => ComponentStatus::Ok,
        };

        let mut report = HealthReport {
            database,
            dialog_system,
            tts,
            jobs,
            masdif: OverallStatus::Ok,
        };
        if report
            .components()
            .iter()
            .any(|(_, s)| *s == ComponentStatus::Down)
        {
            report.masdif = OverallStatus::Unhealthy;
        }
        report
    }
}

async fn probe(adapter: &(impl PluginAdapter + ?Sized)) -> ComponentStatus {
    let status: Result<HealthStatus, MasdifError> = adapter.health_check().await;
    match status {
        Ok(s) if s.is_up() => ComponentStatus::Ok,
        Ok(s) => {
            warn!(adapter = adapter.name(), status = ?s, "health check reports down");
            ComponentStatus::Down
        }
        Err(e) => {
            warn!(adapter = adapter.name(), error = %e, "health check failed");
            ComponentStatus::Down
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use masdif_test_utils::TestHarness;

    #[tokio::test]
    async fn all_up_is_ok() {
        let h = TestHarness::new().await.unwrap();
        let checker = HealthChecker::new(h.storage.clone(), h.dialog.clone()).with_tts(h.tts.clone());
        let report = checker.check().await;
        assert!(report.is_healthy());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "database": "OK", "dialog_system": "OK", "tts": "OK", "jobs": "OK", "masdif": "OK"
            })
        );
    }

    #[tokio::test]
    async fn dialog_down_makes_overall_unhealthy() {
        let h = TestHarness::new().await.unwrap();
        h.dialog.set_failure(Some((503, "Service Unavailable"))).await;
        let report = HealthChecker::new(h.storage.clone(), h.dialog.clone()).check().await;
        assert_eq!(report.dialog_system, ComponentStatus::Down);
        assert_eq!(report.masdif, OverallStatus::Unhealthy);
    }

    #[tokio::test]
    async fn stalled_job_runner_is_down() {
        let h = TestHarness::new().await.unwrap();
        let monitor = Arc::new(JobsMonitor::new());
        let checker = HealthChecker::new(h.storage.clone(), h.dialog.clone())
            .with_jobs(monitor.clone(), Duration::from_secs(10));
        assert_eq!(checker.check().await.jobs, ComponentStatus::Down);
        monitor.tick();
        assert_eq!(checker.check().await.jobs, ComponentStatus::Ok);
    }

    #[tokio::test]
    async fn tts_failure_is_reported() {
        let h = TestHarness::new().await.unwrap();
        h.tts.set_failing(true);
        let report = HealthChecker::new(h.storage.clone(), h.dialog.clone())
            .with_tts(h.tts.clone())
            .check()
            .await;
        assert_eq!(report.tts, ComponentStatus::Down);
        assert!(!report.is_healthy());
    }
}
