// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `masdif serve` command implementation.
//!
//! Opens SQLite storage, connects the Rasa dialog engine and (when enabled)
//! the speech synthesizer, starts the cleanup worker and serves the HTTP API
//! until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use masdif_config::model::MasdifConfig;
use masdif_core::{MasdifError, PluginAdapter, StorageAdapter};
use masdif_dialog::RasaDialogEngine;
use masdif_gateway::{AuthConfig, GatewayState};
use masdif_pipeline::{
    CleanupWorker, HealthChecker, JobsMonitor, QueueScheduler, TurnOrchestrator, shutdown,
};
use masdif_storage::SqliteStorage;
use masdif_tts::TiroSynthesizer;
use tracing::{debug, info, warn};

/// Upper bound for background tasks to stop after the server has drained.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The job runner counts as down after missing this many polls.
const MISSED_POLLS_BEFORE_DOWN: u32 = 5;

/// Runs the gateway until a shutdown signal arrives.
pub async fn run_serve(config: MasdifConfig) -> Result<(), MasdifError> {
    let config = Arc::new(config);
    info!(version = masdif_core::masdif_version(), "masdif starting");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage ready");

    let dialog = Arc::new(RasaDialogEngine::new(&config.dialog)?);
    info!(url = %config.dialog.url, "dialog engine configured");

    let cancel = shutdown::install_signal_handler();
    let mut tasks = Vec::new();

    let tts = if config.tts.enabled {
        let tts = Arc::new(TiroSynthesizer::new(&config.tts)?);
        tasks.push(tts.start_refresher(cancel.clone()));
        info!(url = %config.tts.url, "speech synthesis enabled");
        Some(tts)
    } else {
        info!("speech synthesis disabled by configuration");
        None
    };

    #[cfg(feature = "prometheus")]
    let prometheus_adapter = if config.prometheus.enabled {
        match masdif_prometheus::PrometheusAdapter::new() {
            Ok(adapter) => Some(Arc::new(adapter)),
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                None
            }
        }
    } else {
        debug!("prometheus metrics disabled by configuration");
        None
    };

    #[cfg(feature = "prometheus")]
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> =
        prometheus_adapter.as_ref().map(|adapter| {
            let adapter = Arc::clone(adapter);
            Arc::new(move || adapter.render()) as Arc<dyn Fn() -> String + Send + Sync>
        });
    #[cfg(not(feature = "prometheus"))]
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> = None;

    let poll_interval = Duration::from_millis(config.jobs.poll_interval_ms.max(1));
    let monitor = Arc::new(JobsMonitor::new());
    let worker = Arc::new(CleanupWorker::new(
        storage.clone(),
        poll_interval,
        Duration::from_secs(config.tts.attachment_timeout_secs),
        monitor.clone(),
    ));
    tasks.push(worker.start(cancel.clone()));

    let scheduler = Arc::new(QueueScheduler::new(storage.clone()));
    let mut orchestrator =
        TurnOrchestrator::new(config.clone(), storage.clone(), dialog.clone(), scheduler);
    let mut health = HealthChecker::new(storage.clone(), dialog.clone())
        .with_jobs(monitor, jobs_max_age(poll_interval));
    if let Some(tts) = &tts {
        orchestrator = orchestrator.with_tts(tts.clone());
        health = health.with_tts(tts.clone());
    }

    let state = GatewayState {
        orchestrator: Arc::new(orchestrator),
        health: Arc::new(health),
        auth: AuthConfig {
            admin_token: config.server.admin_token.clone(),
        },
        prometheus_render,
    };

    let served = masdif_gateway::start_server(&config.server, state, cancel.clone()).await;

    // A bind failure returns before any signal; stop the background tasks too.
    cancel.cancel();
    shutdown::drain_tasks(tasks, DRAIN_TIMEOUT).await;

    if let Some(tts) = &tts {
        shutdown_adapter(tts.as_ref()).await;
    }
    shutdown_adapter(dialog.as_ref()).await;
    shutdown_adapter(storage.as_ref()).await;

    if served.is_ok() {
        info!("masdif shutdown complete");
    }
    served
}

async fn shutdown_adapter(adapter: &dyn PluginAdapter) {
    if let Err(e) = adapter.shutdown().await {
        warn!(adapter = adapter.name(), error = %e, "adapter shutdown failed");
    }
}

fn jobs_max_age(poll_interval: Duration) -> Duration {
    (poll_interval * MISSED_POLLS_BEFORE_DOWN).max(Duration::from_secs(30))
}
