// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Restart behavior over the SQLite store: state written by one host is
//! picked up by the next one through reconciliation.

use std::path::Path;
use std::sync::Arc;

use modelhub_core::{ModelType, PluginStatus};
use modelhub_model::{ModelClient, ModelConfiguration};
use modelhub_plugin::{
    ModelPluginAdapter, PluginContextFactory, PluginDirs, PluginManager, ProviderPlugin,
    SqlitePluginStore, StaticEntryPoints,
};
use modelhub_test_utils::{MockProviderPlugin, PackageBuilder};

struct Host {
    manager: PluginManager,
    adapter: Arc<ModelPluginAdapter>,
    configuration: Arc<ModelConfiguration>,
}

async fn host(root: &Path) -> Host {
    let store = Arc::new(SqlitePluginStore::open(root.join("modelhub.db")).await.unwrap());
    let entry_points = Arc::new(StaticEntryPoints::new());
    entry_points.register("acme", || {
        Ok(Arc::new(MockProviderPlugin::new("acme").with_model("gpt", ModelType::Chat))
            as Arc<dyn ProviderPlugin>)
    });
    let configuration = Arc::new(ModelConfiguration::default());
    let adapter = Arc::new(ModelPluginAdapter::new(
        Arc::clone(&configuration),
        entry_points,
        PluginContextFactory::new(root.join("work"), store.clone()),
    ));
    let manager = PluginManager::builder(store, PluginDirs::under(root))
        .adapter(adapter.clone())
        .build();
    Host {
        manager,
        adapter,
        configuration,
    }
}

#[tokio::test]
async fn enabled_plugin_is_restored_after_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let first = host(dir.path()).await;
        let bytes = PackageBuilder::new("acme").build().unwrap();
        first
            .manager
            .install(std::io::Cursor::new(bytes), "acme.tar.gz")
            .await
            .unwrap();
        first.manager.enable("acme").await.unwrap();
        assert!(first.configuration.models().contains("acme", "gpt"));
    }

    let second = host(dir.path()).await;
    assert!(second.configuration.models().is_empty());

    let summary = second.manager.reconcile().await.unwrap();

    assert_eq!(summary.restored, vec!["acme"]);
    assert!(second.adapter.is_loaded("acme"));
    let client = ModelClient::new(Arc::clone(&second.configuration));
    assert!(client.is_model_available("acme:gpt"));
    let record = second.manager.get("acme").await.unwrap().unwrap();
    assert_eq!(record.status, PluginStatus::Enabled);
}

#[tokio::test]
async fn disabled_plugin_stays_unloaded_after_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let first = host(dir.path()).await;
        let bytes = PackageBuilder::new("acme").build().unwrap();
        first
            .manager
            .install(std::io::Cursor::new(bytes), "acme.tar.gz")
            .await
            .unwrap();
        first.manager.enable("acme").await.unwrap();
        first.manager.disable("acme").await.unwrap();
    }

    let second = host(dir.path()).await;
    let summary = second.manager.reconcile().await.unwrap();

    assert!(summary.restored.is_empty());
    assert!(!second.adapter.is_loaded("acme"));
    let records = second
        .manager
        .list_by_status(PluginStatus::Disabled)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}
