// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions and recording helpers.
//!
//! Written against the metrics-rs facade; without an installed recorder
//! every call is a no-op.

use metrics::{describe_counter, describe_histogram};

/// Registers all Masdif metric descriptions. Call once after installing the recorder.
pub fn register_metrics() {
    describe_counter!("masdif_turns_total", "Conversation turns handled, by outcome");
    describe_counter!(
        "masdif_conversations_total",
        "Conversations created or deleted, by operation"
    );
    describe_counter!("masdif_feedback_total", "Feedback directives accepted");
    describe_counter!("masdif_tts_results_total", "Speech synthesis results");
    describe_counter!(
        "masdif_attachments_purged_total",
        "Attachments removed by the cleanup worker"
    );
    describe_histogram!(
        "masdif_dialog_seconds",
        "Round trip to the dialog engine per turn"
    );
    describe_histogram!("masdif_tts_seconds", "Speech synthesis time per turn");
    describe_histogram!("masdif_turn_seconds", "Total handling time per turn");
}

/// Outcome label values: `ok`, `client_error`, `dialog_error`, `error`.
pub fn record_turn(outcome: &'static str) {
    metrics::counter!("masdif_turns_total", "outcome" => outcome).increment(1);
}

pub fn record_conversation(operation: &'static str) {
    metrics::counter!("masdif_conversations_total", "operation" => operation).increment(1);
}

pub fn record_feedback(forwarded: bool) {
    let forwarded = if forwarded { "true" } else { "false" };
    metrics::counter!("masdif_feedback_total", "forwarded" => forwarded).increment(1);
}

pub fn record_tts_result(result: &str) {
    metrics::counter!("masdif_tts_results_total", "result" => result.to_string()).increment(1);
}

pub fn record_attachments_purged(count: usize) {
    metrics::counter!("masdif_attachments_purged_total").increment(count as u64);
}

/// Records the three per-turn timings, skipping any that were not measured.
pub fn record_timings(dialog: Option<f64>, tts: Option<f64>, overall: Option<f64>) {
    if let Some(s) = dialog {
        metrics::histogram!("masdif_dialog_seconds").record(s);
    }
    if let Some(s) = tts {
        metrics::histogram!("masdif_tts_seconds").record(s);
    }
    if let Some(s) = overall {
        metrics::histogram!("masdif_turn_seconds").record(s);
    }
}
