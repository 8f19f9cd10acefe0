// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Masdif gateway.
//!
//! TOML files are layered with `MASDIF_*` environment overrides, rejected on
//! unknown keys, validated semantically, and reported through miette
//! diagnostics with typo suggestions.
//!
//! ```no_run
//! use masdif_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("dialog engine at {}", config.dialog.url);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::MasdifConfig;

/// Loads configuration from the standard file hierarchy and validates it.
pub fn load_and_validate() -> Result<MasdifConfig, Vec<ConfigError>> {
    finish(loader::load_config(), hierarchy_sources)
}

/// Loads configuration from an explicit file (plus env overrides) and validates it.
pub fn load_and_validate_path(path: &Path) -> Result<MasdifConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        read_sources([path.to_path_buf()])
    })
}

/// Loads configuration from a TOML string and validates it.
pub fn load_and_validate_str(toml_content: &str) -> Result<MasdifConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validates a loaded config, or turns the load failure into diagnostics.
///
/// `sources` is only read on failure, to give diagnostics a file to point into.
fn finish(
    loaded: Result<MasdifConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<MasdifConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

fn hierarchy_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::LOCAL_CONFIG))
        .unwrap_or_else(|_| PathBuf::from(loader::LOCAL_CONFIG));
    let candidates = [
        Some(local),
        loader::user_config_path(),
        Some(PathBuf::from(loader::SYSTEM_CONFIG)),
    ];
    read_sources(candidates.into_iter().flatten())
}

/// `(display path, content)` for every readable file in `paths`.
fn read_sources(paths: impl IntoIterator<Item = PathBuf>) -> Vec<(String, String)> {
    paths
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}
