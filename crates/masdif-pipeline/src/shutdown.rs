// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown.
//!
//! SIGINT and SIGTERM cancel a shared [`CancellationToken`] observed by the
//! HTTP server, the voice refresher, and the cleanup worker.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Returns a token cancelled on the first SIGINT or SIGTERM.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler, only Ctrl+C will stop the server");
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received SIGINT (Ctrl+C), initiating shutdown");
            }
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received SIGINT (Ctrl+C), initiating shutdown");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, initiating shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl+C, initiating shutdown");
}

/// Waits for background tasks to finish, giving up after `timeout`.
pub async fn drain_tasks(tasks: Vec<JoinHandle<()>>, timeout: Duration) {
    if tasks.is_empty() {
        return;
    }
    let count = tasks.len();
    match tokio::time::timeout(timeout, join_in_order(tasks)).await {
        Ok(()) => info!(count, "background tasks stopped"),
        Err(_) => warn!(count, "timeout reached, some background tasks were interrupted"),
    }
}

async fn join_in_order(tasks: Vec<JoinHandle<()>>) {
    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "background task panicked or was aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_signal_handler_returns_live_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn drain_waits_for_cancelled_tasks() {
        let token = CancellationToken::new();
        let child = token.clone();
        let task = tokio::spawn(async move { child.cancelled().await });
        token.cancel();
        drain_tasks(vec![task], Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn drain_gives_up_after_timeout() {
        let task = tokio::spawn(async { tokio::time::sleep(Duration::from_secs(60)).await });
        let started = std::time::Instant::now();
        drain_tasks(vec![task], Duration::from_millis(20)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
