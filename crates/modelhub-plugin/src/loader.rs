// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry point resolution for provider plugins.
//!
//! A plugin record names its entry point in `main_entry`. The loader turns
//! that name into a live [`ProviderPlugin`]. [`StaticEntryPoints`] resolves
//! names against constructors compiled into the host binary.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use modelhub_core::{HubError, PluginRecord};
use tracing::debug;

use crate::provider::ProviderPlugin;

/// Constructs a fresh provider instance.
pub type ProviderConstructor =
    Arc<dyn Fn() -> Result<Arc<dyn ProviderPlugin>, HubError> + Send + Sync>;

#[async_trait]
pub trait EntryPointLoader: Send + Sync + 'static {
    /// Instantiates the provider for `record`.
    async fn load(&self, record: &PluginRecord) -> Result<Arc<dyn ProviderPlugin>, HubError>;
}

/// Table of compiled-in provider constructors keyed by entry point name.
#[derive(Default)]
pub struct StaticEntryPoints {
    constructors: DashMap<String, ProviderConstructor>,
}

impl StaticEntryPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `entry`, replacing any previous one.
    pub fn register<F>(&self, entry: impl Into<String>, constructor: F)
    where
        F: Fn() -> Result<Arc<dyn ProviderPlugin>, HubError> + Send + Sync + 'static,
    {
        let entry = entry.into();
        debug!(entry = %entry, "registering provider entry point");
        self.constructors.insert(entry, Arc::new(constructor));
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.constructors.contains_key(entry)
    }

    /// Registered entry point names, sorted.
    pub fn entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self
            .constructors
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        entries.sort();
        entries
    }
}

#[async_trait]
impl EntryPointLoader for StaticEntryPoints {
    async fn load(&self, record: &PluginRecord) -> Result<Arc<dyn ProviderPlugin>, HubError> {
        // Clone the constructor out so the map guard is not held while it runs.
        let constructor = self
            .constructors
            .get(&record.main_entry)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| HubError::EntryPointNotFound {
                entry: record.main_entry.clone(),
            })?;
        debug!(plugin_id = %record.plugin_id, entry = %record.main_entry, "instantiating provider");
        constructor()
    }
}

impl std::fmt::Debug for StaticEntryPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticEntryPoints")
            .field("entries", &self.entries())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::record;
    use modelhub_core::{ModelDefinition, ModelType, PluginStatus};
    use modelhub_model::ModelFactory;

    struct Inert;

    impl ModelFactory for Inert {
        fn supports(&self, _model_type: ModelType) -> bool {
            false
        }
    }

    impl ProviderPlugin for Inert {
        fn namespace(&self) -> &str {
            "inert"
        }

        fn factory(&self) -> Arc<dyn ModelFactory> {
            Arc::new(Inert)
        }

        fn models(&self) -> Result<Vec<ModelDefinition>, HubError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn registered_entry_is_instantiated() {
        let entries = StaticEntryPoints::new();
        entries.register("inert", || Ok(Arc::new(Inert) as Arc<dyn ProviderPlugin>));

        let mut r = record("p1", PluginStatus::Disabled);
        r.main_entry = "inert".to_string();
        let provider = entries.load(&r).await.unwrap();
        assert_eq!(provider.namespace(), "inert");
        assert_eq!(entries.entries(), vec!["inert".to_string()]);
    }

    #[tokio::test]
    async fn unknown_entry_is_reported() {
        let entries = StaticEntryPoints::new();
        let mut r = record("p1", PluginStatus::Disabled);
        r.main_entry = "missing".to_string();

        let err = entries.load(&r).await.err().unwrap();
        assert!(matches!(err, HubError::EntryPointNotFound { entry } if entry == "missing"));
    }
}
