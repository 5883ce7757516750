// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end lifecycle and dispatch testing.
//!
//! `TestHarness` assembles a plugin manager with the model adapter over
//! in-memory stores and temp directories, and a model client reading the
//! same configuration the adapter registers into.

use std::path::PathBuf;
use std::sync::Arc;

use modelhub_core::{HubError, PluginRecord};
use modelhub_model::{Environment, ModelClient, ModelConfiguration};
use modelhub_plugin::{
    BroadcastPublisher, MemoryConfigStore, MemoryPluginStore, ModelPluginAdapter,
    PluginContextFactory, PluginDirs, PluginManager, ProviderPlugin, StaticEntryPoints,
};
use tempfile::TempDir;

use crate::mock_plugin::MockProviderPlugin;
use crate::package::PackageBuilder;

/// A complete plugin host with mock collaborators and temp storage.
pub struct TestHarness {
    pub manager: PluginManager,
    pub adapter: Arc<ModelPluginAdapter>,
    pub entry_points: Arc<StaticEntryPoints>,
    pub configuration: Arc<ModelConfiguration>,
    pub client: ModelClient,
    pub store: Arc<MemoryPluginStore>,
    pub config_store: Arc<MemoryConfigStore>,
    pub events: BroadcastPublisher,
    pub dirs: PluginDirs,
    pub work_root: PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Result<Self, HubError> {
        let temp_dir = TempDir::new()?;
        let dirs = PluginDirs::under(temp_dir.path().join("plugins"));
        let work_root = temp_dir.path().join("plugins").join("work");

        let store = Arc::new(MemoryPluginStore::new());
        let config_store = Arc::new(MemoryConfigStore::new());
        let entry_points = Arc::new(StaticEntryPoints::new());
        let events = BroadcastPublisher::default();
        let configuration = Arc::new(ModelConfiguration::new(Environment::default()));

        let adapter = Arc::new(ModelPluginAdapter::new(
            Arc::clone(&configuration),
            entry_points.clone(),
            PluginContextFactory::new(work_root.clone(), config_store.clone()),
        ));
        let manager = PluginManager::builder(store.clone(), dirs.clone())
            .events(Arc::new(events.clone()))
            .adapter(adapter.clone())
            .build();
        let client = ModelClient::new(Arc::clone(&configuration));

        Ok(Self {
            manager,
            adapter,
            entry_points,
            configuration,
            client,
            store,
            config_store,
            events,
            dirs,
            work_root,
            _temp_dir: temp_dir,
        })
    }

    /// Makes `provider` the instance returned for entry point `entry`.
    pub fn register_provider(&self, entry: &str, provider: Arc<MockProviderPlugin>) {
        self.entry_points
            .register(entry, move || Ok(provider.clone() as Arc<dyn ProviderPlugin>));
    }

    /// Builds `package` and installs it through the manager.
    pub async fn install(&self, package: &PackageBuilder) -> Result<PluginRecord, HubError> {
        let bytes = package.build()?;
        self.manager
            .install(std::io::Cursor::new(bytes), "plugin.tar.gz")
            .await
    }

    /// Installs and enables a model plugin whose entry point serves `provider`.
    pub async fn install_provider(
        &self,
        plugin_id: &str,
        provider: Arc<MockProviderPlugin>,
    ) -> Result<PluginRecord, HubError> {
        self.register_provider(plugin_id, provider);
        self.install(&PackageBuilder::new(plugin_id)).await?;
        self.manager.enable(plugin_id).await
    }
}
