// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./modelhub.toml` > `~/.config/modelhub/modelhub.toml` >
//! `/etc/modelhub/modelhub.toml` with environment variable overrides via `MODELHUB_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ModelhubConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/modelhub/modelhub.toml` (system-wide)
/// 3. `~/.config/modelhub/modelhub.toml` (user XDG config)
/// 4. `./modelhub.toml` (local directory)
/// 5. `MODELHUB_*` environment variables
pub fn load_config() -> Result<ModelhubConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ModelhubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ModelhubConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ModelhubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ModelhubConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ModelhubConfig::default()))
        .merge(Toml::file("/etc/modelhub/modelhub.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("modelhub/modelhub.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("modelhub.toml"))
        .merge(env_provider())
}

/// Environment provider mapping the first underscore to a section dot.
///
/// `MODELHUB_PLUGINS_ROOT_DIR` maps to `plugins.root_dir`, not
/// `plugins.root.dir`, so `Env::split("_")` cannot be used.
fn env_provider() -> Env {
    Env::prefixed("MODELHUB_").map(|key| {
        // `key` is the env var name with the prefix stripped.
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or(key_str);
        mapped.into()
    })
}

/// Top-level sections reachable through `MODELHUB_<SECTION>_<KEY>`.
const ENV_SECTIONS: [&str; 4] = ["logging", "storage", "plugins", "environment"];
