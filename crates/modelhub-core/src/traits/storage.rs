// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits for plugin records and plugin-scoped configuration.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::HubError;
use crate::types::{PluginRecord, PluginStatus};

/// Persists plugin records by id and by status.
///
/// Implementations must be safe for concurrent use and replace records
/// atomically by key.
#[async_trait]
pub trait PluginStore: Send + Sync + 'static {
    /// Creates a record. Fails with `AlreadyInstalled` if the id exists.
    async fn insert(&self, record: &PluginRecord) -> Result<(), HubError>;

    /// Replaces an existing record. Fails with `PluginNotFound` if absent.
    async fn update(&self, record: &PluginRecord) -> Result<(), HubError>;

    async fn get(&self, plugin_id: &str) -> Result<Option<PluginRecord>, HubError>;

    /// All records, sorted by plugin id.
    async fn list(&self) -> Result<Vec<PluginRecord>, HubError>;

    /// Records currently in `status`, sorted by plugin id.
    async fn list_by_status(&self, status: PluginStatus) -> Result<Vec<PluginRecord>, HubError>;

    /// Removes a record. Returns whether a record existed.
    async fn delete(&self, plugin_id: &str) -> Result<bool, HubError>;
}

/// Key/value configuration scoped to a single plugin id.
#[async_trait]
pub trait PluginConfigStore: Send + Sync + 'static {
    async fn get_config(&self, plugin_id: &str, key: &str) -> Result<Option<String>, HubError>;

    async fn set_config(&self, plugin_id: &str, key: &str, value: &str) -> Result<(), HubError>;

    async fn remove_config(&self, plugin_id: &str, key: &str) -> Result<(), HubError>;

    async fn list_config(&self, plugin_id: &str) -> Result<BTreeMap<String, String>, HubError>;

    /// Drops every key of `plugin_id`.
    async fn clear_config(&self, plugin_id: &str) -> Result<(), HubError>;
}
