// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.
//!
//! All failures are collected; validation never stops at the first one.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{MasdifConfig, OUTPUT_FORMATS};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &MasdifConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |key: &str, message: String| errors.push(ConfigError::validation(key, message));

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        fail(
            "logging.level",
            format!(
                "`{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        );
    }

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host", "must not be empty".into());
    } else if host.parse::<std::net::IpAddr>().is_err() && !is_hostname(host) {
        fail(
            "server.host",
            format!("`{host}` is not an IP address or hostname"),
        );
    }

    for (key, url) in [
        ("server.public_url", &config.server.public_url),
        ("dialog.url", &config.dialog.url),
    ] {
        if !is_http_url(url) {
            fail(key, format!("`{url}` must start with http:// or https://"));
        }
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path", "must not be empty".into());
    }
    if config.dialog.timeout_secs == 0 {
        fail("dialog.timeout_secs", "must be at least 1".into());
    }

    // Speech settings only matter when synthesis is on.
    if config.tts.enabled {
        if !is_http_url(&config.tts.url) {
            fail(
                "tts.url",
                format!("`{}` must start with http:// or https://", config.tts.url),
            );
        }
        if config.tts.retry_attempts == 0 {
            fail("tts.retry_attempts", "must be at least 1".into());
        }
        if config.tts.voice_refresh_secs == 0 {
            fail("tts.voice_refresh_secs", "must be at least 1".into());
        }
        if !OUTPUT_FORMATS.contains(&config.tts.output_format.as_str()) {
            fail(
                "tts.output_format",
                format!(
                    "`{}` is not one of {}",
                    config.tts.output_format,
                    OUTPUT_FORMATS.join(", ")
                ),
            );
        }
    }

    let forward_intent = config.feedback.intent.as_deref().map(str::trim);
    if config.feedback.forward && forward_intent.is_none_or(str::is_empty) {
        fail(
            "feedback.intent",
            "required when feedback.forward is enabled".into(),
        );
    }

    let languages = &config.languages;
    if languages.supported.is_empty() {
        fail("languages.supported", "must list at least one language".into());
    } else if !languages.is_supported(&languages.default) {
        fail(
            "languages.default",
            format!("`{}` is not listed in languages.supported", languages.default),
        );
    }
    let mut seen = HashSet::new();
    for entry in &languages.supported {
        if !seen.insert(entry.lang.as_str()) {
            fail(
                "languages.supported",
                format!("`{}` is listed twice", entry.lang),
            );
        }
    }

    if config.jobs.poll_interval_ms == 0 {
        fail("jobs.poll_interval_ms", "must be at least 1".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_hostname(host: &str) -> bool {
    host.chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | ':'))
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
