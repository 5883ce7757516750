// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the plugin lifecycle manager and the model layer.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Category of an installable plugin. Each category is served by one adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Model,
    Tool,
    Channel,
}

/// Persisted lifecycle state of a plugin record.
///
/// "Not installed" has no variant: it is the absence of a record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    Installing,
    InstallFailed,
    Disabled,
    Enabling,
    Enabled,
    Disabling,
    Uninstalling,
    UninstallFailed,
}

impl PluginStatus {
    /// Whether an uninstall may start from this status (after an implicit
    /// disable for `Enabled`).
    pub fn is_uninstallable(self) -> bool {
        matches!(
            self,
            PluginStatus::Disabled
                | PluginStatus::Enabled
                | PluginStatus::InstallFailed
                | PluginStatus::UninstallFailed
        )
    }

    /// For an in-flight transition that a crash could have interrupted, the
    /// status the operation would have left behind on failure.
    pub fn interrupted_outcome(self) -> Option<PluginStatus> {
        match self {
            PluginStatus::Installing => Some(PluginStatus::InstallFailed),
            PluginStatus::Enabling | PluginStatus::Disabling => Some(PluginStatus::Disabled),
            PluginStatus::Uninstalling => Some(PluginStatus::UninstallFailed),
            _ => None,
        }
    }
}

/// Kind of runtime model a definition describes and a factory builds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Chat,
    Image,
    Embedding,
}

/// How a model endpoint authenticates requests.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    #[default]
    None,
    ApiKey,
    Bearer,
    Basic,
}

/// Identity and lifecycle state of an installed plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Globally unique id, immutable after creation.
    pub plugin_id: String,
    pub name: String,
    pub version: String,
    pub plugin_type: PluginType,
    pub status: PluginStatus,
    /// Location of the installed package. Always set on persisted records.
    pub package_path: Option<PathBuf>,
    /// Name of the entry point the adapter resolves through its loader.
    pub main_entry: String,
    pub icon_path: Option<PathBuf>,
    /// Hex-encoded SHA-256 of the installed package.
    pub checksum: Option<String>,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PluginRecord {
    /// Moves the record to `status` and bumps `updated_at`.
    pub fn set_status(&mut self, status: PluginStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// Lifecycle transition announced to the event publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEventKind {
    Installed,
    Enabled,
    Disabled,
    Uninstalled,
}

/// A lifecycle event carrying the plugin id it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleEventKind,
    pub plugin_id: String,
    pub at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(kind: LifecycleEventKind, plugin_id: impl Into<String>) -> Self {
        Self {
            kind,
            plugin_id: plugin_id.into(),
            at: Utc::now(),
        }
    }
}
