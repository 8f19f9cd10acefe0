// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deferred attachment cleanup.
//!
//! Purges are persisted as delayed jobs on the `attachment_cleanup` queue by
//! [`QueueScheduler`] and executed by [`CleanupWorker`], so pending purges
//! survive a restart. On start the worker also removes attachments left
//! behind by a previous run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use masdif_core::types::TIMESTAMP_FORMAT;
use masdif_core::{AttachmentKind, AttachmentScheduler, MasdifError, StorageAdapter};

/// Queue name for attachment purge jobs.
pub const CLEANUP_QUEUE: &str = "attachment_cleanup";

/// Days that jobs which ran out of attempts are kept for inspection.
const FAILED_JOB_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PurgeJob {
    message_id: String,
    kind: AttachmentKind,
}

fn timestamp_after(delay: Duration) -> Result<String, MasdifError> {
    let delay = chrono::Duration::from_std(delay)
        .map_err(|e| MasdifError::Internal(format!("purge delay out of range: {e}")))?;
    Ok((chrono::Utc::now() + delay)
        .format(TIMESTAMP_FORMAT)
        .to_string())
}

/// [`AttachmentScheduler`] backed by the persisted job queue.
pub struct QueueScheduler {
    storage: Arc<dyn StorageAdapter>,
}

impl QueueScheduler {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl AttachmentScheduler for QueueScheduler {
    async fn schedule_purge(
        &self,
        message_id: &str,
        kind: AttachmentKind,
        delay: Duration,
    ) -> Result<(), MasdifError> {
        let payload = serde_json::to_string(&PurgeJob {
            message_id: message_id.to_string(),
            kind,
        })
        .map_err(|e| MasdifError::Internal(format!("failed to encode purge job: {e}")))?;
        let run_after = timestamp_after(delay)?;
        let id = self
            .storage
            .enqueue(CLEANUP_QUEUE, &payload, &run_after)
            .await?;
        debug!(job_id = id, message_id, %kind, run_after = %run_after, "attachment purge scheduled");
        Ok(())
    }
}

/// Liveness of the background job runner, read by the health check.
#[derive(Debug, Default)]
pub struct JobsMonitor {
    running: AtomicBool,
    last_tick_ms: AtomicI64,
}

impl JobsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed poll.
    pub fn tick(&self) {
        self.running.store(true, Ordering::SeqCst);
        self.last_tick_ms
            .store(chrono::Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    pub fn stopped(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// True when the runner is started and polled within `max_age`.
    pub fn is_alive(&self, max_age: Duration) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            return false;
        }
        let age_ms = chrono::Utc::now().timestamp_millis() - self.last_tick_ms.load(Ordering::SeqCst);
        age_ms >= 0 && (age_ms as u128) <= max_age.as_millis()
    }
}

/// Polls the cleanup queue and purges due attachments.
pub struct CleanupWorker {
    storage: Arc<dyn StorageAdapter>,
    poll_interval: Duration,
    attachment_timeout: Duration,
    monitor: Arc<JobsMonitor>,
}

impl CleanupWorker {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        poll_interval: Duration,
        attachment_timeout: Duration,
        monitor: Arc<JobsMonitor>,
    ) -> Self {
        Self {
            storage,
            poll_interval,
            attachment_timeout,
            monitor,
        }
    }

    /// Removes attachments older than the attachment timeout.
    pub async fn purge_stale(&self) -> Result<usize, MasdifError> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(self.attachment_timeout).map_err(|e| {
                MasdifError::Internal(format!("attachment timeout out of range: {e}"))
            })?;
        let removed = self
            .storage
            .purge_attachments_older_than(&cutoff.format(TIMESTAMP_FORMAT).to_string())
            .await?;
        if removed > 0 {
            info!(removed, "purged stale attachments");
            #[cfg(feature = "prometheus")]
            masdif_prometheus::record_attachments_purged(removed);
        }
        Ok(removed)
    }

    /// Runs every due purge job, then drops old exhausted ones. Returns how
    /// many jobs were processed.
    pub async fn run_once(&self) -> Result<usize, MasdifError> {
        let mut processed = 0;
        while let Some(entry) = self.storage.dequeue(CLEANUP_QUEUE).await? {
            processed += 1;
            let job: PurgeJob = match serde_json::from_str(&entry.payload) {
                Ok(job) => job,
                Err(e) => {
                    warn!(job_id = entry.id, error = %e, "dropping undecodable purge job");
                    self.storage.ack(entry.id).await?;
                    continue;
                }
            };

            match self
                .storage
                .purge_attachments(&job.message_id, job.kind)
                .await
            {
                Ok(0) => {
                    debug!(message_id = %job.message_id, "nothing to purge, message or attachment already gone");
                    self.storage.ack(entry.id).await?;
                }
                Ok(removed) => {
                    info!(message_id = %job.message_id, kind = %job.kind, removed, "attachment purged");
                    #[cfg(feature = "prometheus")]
                    masdif_prometheus::record_attachments_purged(removed);
                    self.storage.ack(entry.id).await?;
                }
                Err(e) => {
                    error!(job_id = entry.id, error = %e, "attachment purge failed");
                    self.storage.fail(entry.id).await?;
                }
            }
        }

        let cutoff = (chrono::Utc::now() - chrono::Duration::days(FAILED_JOB_RETENTION_DAYS))
            .format(TIMESTAMP_FORMAT)
            .to_string();
        let pruned = self.storage.prune_failed_jobs(CLEANUP_QUEUE, &cutoff).await?;
        if pruned > 0 {
            debug!(pruned, "pruned exhausted purge jobs");
        }
        Ok(processed)
    }

    /// Spawns the polling loop. Stops when `cancel` fires.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.purge_stale().await {
                warn!(error = %e, "startup attachment purge failed");
            }

            let mut interval = tokio::time::interval(self.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(poll_ms = self.poll_interval.as_millis() as u64, "cleanup worker started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("cleanup worker shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = self.run_once().await {
                            error!(error = %e, "cleanup poll failed");
                        }
                        self.monitor.tick();
                    }
                }
            }
            self.monitor.stopped();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purge_job_payload_shape() {
        let job = PurgeJob {
            message_id: "m1".into(),
            kind: AttachmentKind::TtsAudio,
        };
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json, serde_json::json!({"message_id": "m1", "kind": "tts_audio"}));
    }

    #[test]
    fn monitor_requires_a_recent_tick() {
        let monitor = JobsMonitor::new();
        assert!(!monitor.is_alive(Duration::from_secs(5)));
        monitor.tick();
        assert!(monitor.is_alive(Duration::from_secs(5)));
        monitor.stopped();
        assert!(!monitor.is_alive(Duration::from_secs(5)));
    }

    #[test]
    fn timestamp_after_is_in_the_future() {
        let now = chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string();
        let later = timestamp_after(Duration::from_secs(60)).unwrap();
        assert!(later > now);
    }

    #[tokio::test]
    async fn processed_jobs_do_not_accumulate() {
        let h = masdif_test_utils::TestHarness::new().await.unwrap();
        let scheduler = QueueScheduler::new(h.storage.clone());
        for i in 0..50 {
            scheduler
                .schedule_purge(&format!("m{i}"), AttachmentKind::TtsAudio, Duration::ZERO)
                .await
                .unwrap();
        }
        let worker = CleanupWorker::new(
            h.storage.clone(),
            Duration::from_millis(10),
            Duration::from_secs(60),
            Arc::new(JobsMonitor::new()),
        );

        assert_eq!(worker.run_once().await.unwrap(), 50);
        assert_eq!(h.storage.queue_depth(CLEANUP_QUEUE).await.unwrap(), 0);
    }
}
