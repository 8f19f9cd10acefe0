// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment errors and semantic validation failures both become
//! [`ConfigError`]s. Each one names the dotted key, the `MASDIF_*` variable
//! that overrides it, and, for typos, the closest valid key.

#![allow(unused_assignments)] // miette's Diagnostic derive triggers this lint

use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a key suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", table_label(.section.as_deref()))]
    #[diagnostic(
        code(masdif::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted table the key was found in; `None` for the top level.
        section: Option<String>,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a masdif setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(masdif::config::invalid_type), help("{}", override_help(key)))]
    InvalidType { key: String, detail: String },

    #[error("missing required key `{key}`")]
    #[diagnostic(code(masdif::config::missing_key), help("{}", override_help(key)))]
    MissingKey { key: String },

    /// Parsed, but unusable: an empty URL, an unsupported default language.
    #[error("invalid `{key}`: {message}")]
    #[diagnostic(code(masdif::config::validation), help("{}", override_help(key)))]
    Validation { key: String, message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(masdif::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn validation(key: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Dotted key this error refers to, when there is one.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::UnknownKey { key, .. }
            | Self::InvalidType { key, .. }
            | Self::MissingKey { key }
            | Self::Validation { key, .. } => Some(key),
            Self::Other(_) => None,
        }
    }

    fn from_figment(error: &figment::Error, toml_sources: &[(String, String)]) -> Self {
        use figment::error::Kind;

        match &error.kind {
            Kind::UnknownField(field, expected) => {
                let section = (!error.path.is_empty()).then(|| error.path.join("."));
                let (span, src) = locate(error, section.as_deref(), field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    section,
                    suggestion: suggest_key(field, expected),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: dotted(&error.path, field),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {actual}, expected {expected}"),
            },
            _ => ConfigError::Other(error.to_string()),
        }
    }
}

fn table_label(section: Option<&str>) -> String {
    match section {
        Some(s) => format!("[{s}]"),
        None => "the top level".to_string(),
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

fn override_help(key: &str) -> String {
    format!("set `{key}` in masdif.toml or export {}", env_var_for(key))
}

fn dotted(path: &[String], field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", path.join("."))
    }
}

/// Environment variable that overrides a dotted key, e.g. `tts.url` -> `MASDIF_TTS_URL`.
pub fn env_var_for(key: &str) -> String {
    format!("MASDIF_{}", key.replace('.', "_").to_ascii_uppercase())
}

/// Converts every error inside a `figment::Error` into a [`ConfigError`].
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| ConfigError::from_figment(&error, toml_sources))
        .collect()
}

fn locate(
    error: &figment::Error,
    section: Option<&str>,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline sources carry no file metadata.
    let source = match file {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    source
        .and_then(|(path, content)| {
            find_key_offset(content, section, field).map(|offset| {
                (
                    Some(SourceSpan::new(offset.into(), field.len())),
                    Some(NamedSource::new(path, content.clone())),
                )
            })
        })
        .unwrap_or((None, None))
}

/// Byte offset of `field` as a key inside table `section` (dotted, e.g. `motd.default`).
///
/// Keys before the first table header belong to the top level (`section == None`).
pub fn find_key_offset(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(header) = trimmed.strip_prefix('[') {
            current = header
                .trim_start_matches('[')
                .split(']')
                .next()
                .map(str::trim);
        } else if current == section && is_key_line(trimmed, field) {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

fn is_key_line(line: &str, field: &str) -> bool {
    line.strip_prefix(field)
        .map(|rest| rest.trim_start().starts_with('='))
        .unwrap_or(false)
}

/// Closest valid key by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for &key in valid_keys {
        let score = strsim::jaro_winkler(unknown, key);
        if score >= SUGGESTION_THRESHOLD && best.is_none_or(|(b, _)| score > b) {
            best = Some((score, key));
        }
    }
    best.map(|(_, key)| key.to_string())
}

/// Prints every error to stderr as a miette report, followed by a count.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
    eprintln!(
        "masdif: {} configuration error{} found",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_default_voice() {
        let valid = &["enabled", "url", "default_voice", "language"];
        assert_eq!(
            suggest_key("defualt_voice", valid),
            Some("default_voice".to_string())
        );
        assert_eq!(suggest_key("zzzzzz", &["host", "port", "public_url"]), None);
    }

    #[test]
    fn finds_key_inside_section() {
        let content = "[server]\nport = 1\n\n[tts]\nurll = \"x\"\n";
        let o = find_key_offset(content, Some("tts"), "urll").unwrap();
        assert_eq!(&content[o..o + 4], "urll");
    }

    #[test]
    fn finds_key_in_nested_table_only() {
        let content = "[motd]\nintent = \"m\"\n[motd.default]\nintent = \"x\"\n";
        let o = find_key_offset(content, Some("motd.default"), "intent").unwrap();
        assert_eq!(o, content.rfind("intent").unwrap());
        assert_eq!(find_key_offset(content, None, "intent"), None);
    }

    #[test]
    fn key_prefix_does_not_match_longer_key() {
        let content = "[tts]\nurl_extra = 1\n";
        assert_eq!(find_key_offset(content, Some("tts"), "url"), None);
    }

    #[test]
    fn help_names_env_override() {
        let err = ConfigError::validation("tts.url", "must start with http:// or https://");
        let help = err.help().unwrap().to_string();
        assert!(help.contains("MASDIF_TTS_URL"));
        assert_eq!(err.key(), Some("tts.url"));
        assert_eq!(env_var_for("server.admin_token"), "MASDIF_SERVER_ADMIN_TOKEN");
    }
}
