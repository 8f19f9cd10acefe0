// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `masdif doctor` command implementation.
//!
//! Runs the same health aggregation as `GET /health` once and prints one line
//! per subsystem.

use std::sync::Arc;
use std::time::Instant;

use masdif_config::model::MasdifConfig;
use masdif_core::{MasdifError, StorageAdapter};
use masdif_dialog::RasaDialogEngine;
use masdif_pipeline::{HealthChecker, HealthReport};
use masdif_storage::SqliteStorage;
use masdif_tts::TiroSynthesizer;

/// Returns whether every subsystem is up.
pub async fn run_doctor(config: &MasdifConfig) -> Result<bool, MasdifError> {
    let started = Instant::now();

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    let dialog = Arc::new(RasaDialogEngine::new(&config.dialog)?);

    let mut checker = HealthChecker::new(storage.clone(), dialog);
    if config.tts.enabled {
        checker = checker.with_tts(Arc::new(TiroSynthesizer::new(&config.tts)?));
    }

    let report = checker.check().await;
    let elapsed_ms = started.elapsed().as_millis();

    println!();
    println!("  masdif doctor");
    println!("  {}", "-".repeat(40));
    for line in format_report(&report) {
        println!("{line}");
    }
    println!("  {}", "-".repeat(40));
    println!("  checked in {elapsed_ms}ms");
    println!();

    storage.close().await?;
    Ok(report.is_healthy())
}

fn format_report(report: &HealthReport) -> Vec<String> {
    report
        .entries()
        .into_iter()
        .map(|(name, status)| format!("  {name:<16}{status}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use masdif_test_utils::TestHarness;

    #[tokio::test]
    async fn report_lines_cover_every_subsystem() {
        let h = TestHarness::new().await.unwrap();
        let report = HealthChecker::new(h.storage.clone(), h.dialog.clone())
            .with_tts(h.tts.clone())
            .check()
            .await;

        let lines = format_report(&report);
        assert_eq!(lines.len(), report.entries().len());
        assert!(lines.iter().any(|l| l.contains("database") && l.ends_with("OK")));
        assert!(lines.last().unwrap().contains("jobs"));
    }

    #[tokio::test]
    async fn failing_tts_marks_report_unhealthy() {
        let h = TestHarness::new().await.unwrap();
        h.tts.set_failing(true);
        let report = HealthChecker::new(h.storage.clone(), h.dialog.clone())
            .with_tts(h.tts.clone())
            .check()
            .await;

        assert!(!report.is_healthy());
        assert!(
            format_report(&report)
                .iter()
                .any(|l| l.contains("tts") && l.ends_with("DOWN"))
        );
    }
}
