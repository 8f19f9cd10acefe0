// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order, later wins:
//! 1. compiled defaults
//! 2. `/etc/masdif/masdif.toml`
//! 3. `~/.config/masdif/masdif.toml`
//! 4. `./masdif.toml`
//! 5. `MASDIF_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MasdifConfig;

pub const SYSTEM_CONFIG: &str = "/etc/masdif/masdif.toml";
pub const LOCAL_CONFIG: &str = "masdif.toml";

/// Top-level sections an environment variable may address.
const SECTIONS: &[&str] = &[
    "logging",
    "server",
    "storage",
    "dialog",
    "tts",
    "feedback",
    "languages",
    "motd",
    "jobs",
    "prometheus",
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("masdif/masdif.toml"))
}

/// Loads configuration from the standard hierarchy with env overrides.
pub fn load_config() -> Result<MasdifConfig, figment::Error> {
    build_figment().extract()
}

/// Loads configuration from a TOML string only. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<MasdifConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MasdifConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Loads configuration from a specific file with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<MasdifConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MasdifConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MasdifConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Maps `MASDIF_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `MASDIF_TTS_DEFAULT_VOICE` lands on `tts.default_voice`.
fn env_provider() -> Env {
    Env::prefixed("MASDIF_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
