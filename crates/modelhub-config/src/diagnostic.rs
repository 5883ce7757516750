// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment reports deserialization failures with a key path but no location.
//! This module turns them into miette diagnostics that point at the offending
//! line of `modelhub.toml`, including keys inside `[[models]]` entries, and
//! suggest the closest valid key for typos.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a valid key must beat to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(modelhub::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a key of this table")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// `key` is the dotted path, e.g. `plugins.max_icon_bytes`.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(modelhub::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(modelhub::config::missing_key),
        help("set `{key}` in modelhub.toml")
    )]
    MissingKey { key: String },

    /// Raised after deserialization by [`crate::validation`].
    #[error("validation error: {message}")]
    #[diagnostic(code(modelhub::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(modelhub::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Converts every error figment collected. `toml_sources` holds
/// `(path, content)` for each file that was merged.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let (span, src) = locate(&error, field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: suggest_key(field, *expected),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: dotted(&error.path, Some(&**field)),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: dotted(&error.path, None),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// `path` joined with dots, skipping the array indices figment inserts for
/// `[[models]]` entries.
fn dotted(path: &[String], field: Option<&str>) -> String {
    path.iter()
        .map(String::as_str)
        .filter(|segment| segment.parse::<usize>().is_err())
        .chain(field)
        .collect::<Vec<_>>()
        .join(".")
}

fn locate(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline sources (tests, `load_config_from_str`) carry no file path.
    let source = match file {
        Some(file) => toml_sources.iter().find(|(path, _)| *path == file),
        None => toml_sources.first(),
    };

    match source {
        Some((path, content)) => match find_key_offset(content, &error.path, field) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(path, content.clone())),
            ),
            None => (None, None),
        },
        None => (None, None),
    }
}

enum Header<'a> {
    Table(&'a str),
    ArrayEntry(&'a str),
}

fn header(line: &str) -> Option<Header<'_>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    if let Some(name) = line.strip_prefix("[[").and_then(|l| l.strip_suffix("]]")) {
        return Some(Header::ArrayEntry(name.trim()));
    }
    line.strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .map(|name| Header::Table(name.trim()))
}

/// Byte offset of `field` inside the table that `path` addresses.
///
/// `["plugins"]` selects `[plugins]`; `["models", "1"]` selects the second
/// `[[models]]` entry and `["models"]` any of them. An empty path means the
/// top level. The search ends at the next table header.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let table = path.first().map(String::as_str);
    let index = path.get(1).and_then(|segment| segment.parse::<usize>().ok());

    let mut inside = table.is_none();
    let mut entries = 0usize;
    let mut start = 0usize;
    for line in content.split_inclusive('\n') {
        let line_start = start;
        start += line.len();

        if let Some(found) = header(line) {
            inside = match (table, found) {
                (Some(table), Header::Table(name)) => index.is_none() && name == table,
                (Some(table), Header::ArrayEntry(name)) if name == table => {
                    entries += 1;
                    index.is_none_or(|i| i + 1 == entries)
                }
                _ => false,
            };
            continue;
        }
        if !inside {
            continue;
        }

        let key = line.trim_start();
        if let Some(after) = key.strip_prefix(field)
            && after.trim_start().starts_with('=')
        {
            return Some(line_start + (line.len() - key.len()));
        }
    }
    None
}

/// Closest valid key to `unknown`, if any is close enough.
pub fn suggest_key<S: AsRef<str>>(unknown: &str, valid_keys: &[S]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key.as_ref()), key.as_ref()))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Writes each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"[logging]
level = "info"

[plugins]
root_dri = "/var/lib/modelhub/plugins"

[[models]]
namespace = "acme"
id = "gpt"

[[models]]
namespace = "acme"
id = "draw"
endpont = "https://acme.test"
"#;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn suggests_plugin_keys() {
        let valid = ["root_dir", "reconcile_on_start", "max_icon_bytes"];
        assert_eq!(suggest_key("root_dri", &valid).as_deref(), Some("root_dir"));
        assert_eq!(
            suggest_key("reconcile_on_strat", &valid).as_deref(),
            Some("reconcile_on_start")
        );
        assert_eq!(suggest_key("zzzzzz", &["level"]), None);
    }

    #[test]
    fn finds_key_in_named_table() {
        let o = find_key_offset(CONFIG, &path(&["plugins"]), "root_dri").unwrap();
        assert!(CONFIG[o..].starts_with("root_dri ="));
        assert_eq!(find_key_offset(CONFIG, &path(&["logging"]), "root_dri"), None);
    }

    #[test]
    fn finds_key_in_indexed_model_entry() {
        let o = find_key_offset(CONFIG, &path(&["models", "1"]), "endpont").unwrap();
        assert!(CONFIG[o..].starts_with("endpont ="));

        let second = find_key_offset(CONFIG, &path(&["models", "1"]), "id").unwrap();
        assert!(CONFIG[second..].starts_with("id = \"draw\""));
        let any = find_key_offset(CONFIG, &path(&["models"]), "id").unwrap();
        assert!(CONFIG[any..].starts_with("id = \"gpt\""));
    }

    #[test]
    fn top_level_search_stops_at_first_table() {
        assert_eq!(find_key_offset(CONFIG, &[], "level"), None);
        let content = "environment = 1\n[logging]\nlevel = \"debug\"\n";
        assert_eq!(find_key_offset(content, &[], "environment"), Some(0));
    }

    #[test]
    fn key_prefixes_do_not_match() {
        let content = "[plugins]\nroot_dir_extra = 1\n";
        assert_eq!(find_key_offset(content, &path(&["plugins"]), "root_dir"), None);
    }

    #[test]
    fn dotted_path_skips_array_indices() {
        assert_eq!(dotted(&path(&["models", "0"]), Some("namespace")), "models.namespace");
        assert_eq!(dotted(&path(&["plugins", "max_icon_bytes"]), None), "plugins.max_icon_bytes");
    }
}
