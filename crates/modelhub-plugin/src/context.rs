// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The capabilities handed to a plugin instance when it is initialized.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use modelhub_core::{HubError, PluginConfigStore};
use tracing::{debug, error, info, warn};

/// Key/value configuration scoped to one plugin id.
#[derive(Clone)]
pub struct ScopedConfig {
    plugin_id: String,
    store: Arc<dyn PluginConfigStore>,
}

impl ScopedConfig {
    pub fn new(plugin_id: impl Into<String>, store: Arc<dyn PluginConfigStore>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            store,
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, HubError> {
        self.store.get_config(&self.plugin_id, key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), HubError> {
        self.store.set_config(&self.plugin_id, key, value).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), HubError> {
        self.store.remove_config(&self.plugin_id, key).await
    }

    pub async fn entries(&self) -> Result<BTreeMap<String, String>, HubError> {
        self.store.list_config(&self.plugin_id).await
    }
}

impl std::fmt::Debug for ScopedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedConfig")
            .field("plugin_id", &self.plugin_id)
            .finish()
    }
}

/// Logging facade that tags every event with the plugin id.
#[derive(Debug, Clone)]
pub struct PluginLogger {
    plugin_id: String,
}

impl PluginLogger {
    pub fn new(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
        }
    }

    pub fn debug(&self, message: &str) {
        debug!(plugin = %self.plugin_id, "[{}] {message}", self.plugin_id);
    }

    pub fn info(&self, message: &str) {
        info!(plugin = %self.plugin_id, "[{}] {message}", self.plugin_id);
    }

    pub fn warn(&self, message: &str) {
        warn!(plugin = %self.plugin_id, "[{}] {message}", self.plugin_id);
    }

    pub fn error(&self, message: &str) {
        error!(plugin = %self.plugin_id, "[{}] {message}", self.plugin_id);
    }
}

#[derive(Debug, Clone)]
pub struct PluginContext {
    plugin_id: String,
    work_dir: PathBuf,
    config: ScopedConfig,
    log: PluginLogger,
}

impl PluginContext {
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Private directory of the plugin. Exists for as long as the plugin is installed.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn config(&self) -> &ScopedConfig {
        &self.config
    }

    pub fn log(&self) -> &PluginLogger {
        &self.log
    }
}

/// Builds [`PluginContext`]s and owns the per-plugin work directories.
#[derive(Clone)]
pub struct PluginContextFactory {
    work_root: PathBuf,
    config_store: Arc<dyn PluginConfigStore>,
}

impl PluginContextFactory {
    pub fn new(work_root: impl Into<PathBuf>, config_store: Arc<dyn PluginConfigStore>) -> Self {
        Self {
            work_root: work_root.into(),
            config_store,
        }
    }

    pub fn work_dir(&self, plugin_id: &str) -> PathBuf {
        self.work_root.join(plugin_id)
    }

    /// Context for `plugin_id`, creating its work directory if missing.
    pub async fn create(&self, plugin_id: &str) -> Result<PluginContext, HubError> {
        let work_dir = self.work_dir(plugin_id);
        tokio::fs::create_dir_all(&work_dir).await?;
        Ok(PluginContext {
            plugin_id: plugin_id.to_string(),
            work_dir,
            config: ScopedConfig::new(plugin_id, Arc::clone(&self.config_store)),
            log: PluginLogger::new(plugin_id),
        })
    }

    /// Removes the work directory and every config key of `plugin_id`.
    pub async fn destroy(&self, plugin_id: &str) -> Result<(), HubError> {
        match tokio::fs::remove_dir_all(self.work_dir(plugin_id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.config_store.clear_config(plugin_id).await
    }
}

impl std::fmt::Debug for PluginContextFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContextFactory")
            .field("work_root", &self.work_root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryConfigStore;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn context_scopes_config_and_creates_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryConfigStore::new());
        let factory = PluginContextFactory::new(dir.path().join("work"), store.clone());

        let ctx = factory.create("acme").await.unwrap();
        assert!(ctx.work_dir().is_dir());
        assert_eq!(ctx.plugin_id(), "acme");

        ctx.config().set("region", "eu").await.unwrap();
        assert_eq!(
            store.get_config("acme", "region").await.unwrap().as_deref(),
            Some("eu")
        );
        assert!(store.get_config("other", "region").await.unwrap().is_none());

        factory.destroy("acme").await.unwrap();
        assert!(!ctx.work_dir().exists());
        assert!(ctx.config().entries().await.unwrap().is_empty());
        factory.destroy("acme").await.unwrap();
    }

    #[traced_test]
    #[test]
    fn logger_prefixes_plugin_id() {
        PluginLogger::new("acme").info("warming up");
        assert!(logs_contain("[acme] warming up"));
    }
}
