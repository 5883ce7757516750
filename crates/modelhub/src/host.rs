// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires configuration, persistence, the plugin manager and the model client.

use std::sync::Arc;

use modelhub_config::ModelhubConfig;
use modelhub_core::HubError;
use modelhub_model::{Environment, ModelClient, ModelConfiguration};
use modelhub_plugin::{
    ArchiveParser, DescriptorValidator, ModelPluginAdapter, PluginContextFactory, PluginDirs, PluginManager,
    SqlitePluginStore, StaticEntryPoints,
};
use tracing::info;

use crate::builtin;

/// A running modelhub instance.
pub struct Host {
    pub manager: PluginManager,
    pub configuration: Arc<ModelConfiguration>,
    pub client: ModelClient,
}

impl Host {
    /// Opens the store, seeds static models and, when configured, restores
    /// the plugins that were enabled when the previous process exited.
    pub async fn start(config: &ModelhubConfig) -> Result<Self, HubError> {
        let store = Arc::new(SqlitePluginStore::open(&config.storage.database_path).await?);

        let configuration = Arc::new(ModelConfiguration::new(Environment::from(
            config.environment.clone(),
        )));
        configuration.load_static_models(&config.models);

        let entries = Arc::new(StaticEntryPoints::new());
        builtin::register(&entries);

        let adapter = Arc::new(ModelPluginAdapter::new(
            Arc::clone(&configuration),
            entries,
            PluginContextFactory::new(config.plugins.work_dir(), store.clone()),
        ));
        let dirs = PluginDirs {
            staging: config.plugins.staging_dir(),
            packages: config.plugins.package_dir(),
            icons: config.plugins.icon_dir(),
        };
        let manager = PluginManager::builder(store, dirs)
            .parser(Arc::new(ArchiveParser::new(config.plugins.max_icon_bytes)))
            .validator(Arc::new(DescriptorValidator::new(
                config.plugins.max_icon_bytes,
            )))
            .adapter(adapter)
            .build();

        if config.plugins.reconcile_on_start {
            let summary = manager.reconcile().await?;
            info!(
                restored = summary.restored.len(),
                failed = summary.failed.len(),
                "plugins reconciled"
            );
        }

        let client = ModelClient::new(Arc::clone(&configuration));
        Ok(Self {
            manager,
            configuration,
            client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> ModelhubConfig {
        let toml = format!(
            r#"
[storage]
database_path = "{db}"

[plugins]
root_dir = "{root}"

[[models]]
namespace = "static"
id = "gpt"
type = "chat"
"#,
            db = dir.join("modelhub.db").display(),
            root = dir.join("plugins").display(),
        );
        modelhub_config::load_config_from_str(&toml).unwrap()
    }

    #[tokio::test]
    async fn start_seeds_static_models() {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::start(&config_in(dir.path())).await.unwrap();

        assert!(host.configuration.models().contains("static", "gpt"));
        // No factory serves the namespace until a plugin provides one.
        assert!(!host.client.is_model_available("static:gpt"));
        assert!(host.manager.list().await.unwrap().is_empty());
    }
}
