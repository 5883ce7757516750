// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the modelhub runtime.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;
use std::path::PathBuf;

use modelhub_core::ModelDefinition;
use serde::{Deserialize, Serialize};

/// Top-level modelhub configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelhubConfig {
    /// Log filter settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Plugin record persistence.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Plugin package, icon and work directory layout.
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Free-form properties exposed to model factories (API keys, base URLs).
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Model definitions declared statically, without an owning plugin.
    #[serde(default)]
    pub models: Vec<ModelDefinition>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database holding plugin records.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    data_dir().join("modelhub.db").to_string_lossy().to_string()
}

/// Plugin directory layout and lifecycle settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PluginsConfig {
    /// Root directory under which staging, packages, icons and work dirs live.
    #[serde(default = "default_plugins_root")]
    pub root_dir: String,

    /// Re-enable plugins persisted as `enabled` when the process starts.
    #[serde(default = "default_true")]
    pub reconcile_on_start: bool,

    /// Largest icon accepted from a plugin package, in bytes.
    #[serde(default = "default_max_icon_bytes")]
    pub max_icon_bytes: u64,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            root_dir: default_plugins_root(),
            reconcile_on_start: true,
            max_icon_bytes: default_max_icon_bytes(),
        }
    }
}

impl PluginsConfig {
    /// Where uploaded packages land before they are validated.
    pub fn staging_dir(&self) -> PathBuf {
        PathBuf::from(&self.root_dir).join("staging")
    }

    /// Where accepted packages are kept for the lifetime of the record.
    pub fn package_dir(&self) -> PathBuf {
        PathBuf::from(&self.root_dir).join("packages")
    }

    /// Parent of the per-plugin work directories.
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.root_dir).join("work")
    }

    pub fn icon_dir(&self) -> PathBuf {
        PathBuf::from(&self.root_dir).join("icons")
    }
}

fn default_plugins_root() -> String {
    data_dir().join("plugins").to_string_lossy().to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_icon_bytes() -> u64 {
    1024 * 1024
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("modelhub"))
        .unwrap_or_else(|| PathBuf::from(".modelhub"))
}
