// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter for `model` plugins.
//!
//! Enabling a model plugin loads its provider through the entry point
//! loader, claims the provider's namespace, and registers the provider's
//! factory, model definitions and options handlers into the shared
//! [`ModelConfiguration`]. Everything registered is recorded together with
//! the entry it replaced, so a failed enable or a disable puts back a static
//! definition or a built-in handler the plugin shadowed. Named handlers are
//! global; one plugin at a time may hold a given name.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use modelhub_core::{HubError, ModelDefinition, OptionsHandler, PluginRecord, PluginType};
use modelhub_model::{HandlerKey, ModelConfiguration};
use tracing::{debug, info, warn};

use crate::adapter::PluginAdapter;
use crate::context::{PluginContext, PluginContextFactory};
use crate::loader::EntryPointLoader;
use crate::provider::ProviderPlugin;

/// The shared provider instance registered for a namespace.
#[derive(Clone)]
pub struct ProviderHandle {
    pub plugin_id: String,
    pub provider: Arc<dyn ProviderPlugin>,
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("plugin_id", &self.plugin_id)
            .field("namespace", &self.provider.namespace())
            .finish()
    }
}

struct RegisteredModel {
    definition: Arc<ModelDefinition>,
    replaced: Option<Arc<ModelDefinition>>,
}

struct RegisteredHandler {
    key: HandlerKey,
    handler: Arc<dyn OptionsHandler>,
    replaced: Option<Arc<dyn OptionsHandler>>,
}

/// What one enabled plugin put into the model configuration.
#[derive(Default)]
struct Registrations {
    namespace: Option<String>,
    models: Vec<RegisteredModel>,
    handlers: Vec<RegisteredHandler>,
    handler_names: Vec<String>,
}

struct LoadedPlugin {
    provider: Arc<dyn ProviderPlugin>,
    context: PluginContext,
    registrations: Registrations,
}

pub struct ModelPluginAdapter {
    configuration: Arc<ModelConfiguration>,
    loader: Arc<dyn EntryPointLoader>,
    contexts: PluginContextFactory,
    /// Enabled plugins by plugin id.
    loaded: DashMap<String, LoadedPlugin>,
    /// Provider singletons by namespace.
    providers: DashMap<String, ProviderHandle>,
    /// Plugin id holding each plugin-registered named handler.
    handler_owners: DashMap<String, String>,
}

impl ModelPluginAdapter {
    pub fn new(
        configuration: Arc<ModelConfiguration>,
        loader: Arc<dyn EntryPointLoader>,
        contexts: PluginContextFactory,
    ) -> Self {
        Self {
            configuration,
            loader,
            contexts,
            loaded: DashMap::new(),
            providers: DashMap::new(),
            handler_owners: DashMap::new(),
        }
    }

    /// Provider currently serving `namespace`, if any.
    pub fn provider(&self, namespace: &str) -> Option<ProviderHandle> {
        self.providers.get(namespace).map(|entry| entry.value().clone())
    }

    pub fn is_loaded(&self, plugin_id: &str) -> bool {
        self.loaded.contains_key(plugin_id)
    }

    /// Ids of the plugins whose providers are live, sorted.
    pub fn loaded_plugins(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.loaded.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    async fn activate(
        &self,
        record: &PluginRecord,
        provider: &Arc<dyn ProviderPlugin>,
        context: &PluginContext,
        registrations: &mut Registrations,
    ) -> Result<(), HubError> {
        provider.initialize(context).await?;

        let namespace = provider.namespace().to_string();
        if namespace.is_empty() || namespace.contains(':') {
            return Err(HubError::provider(format!(
                "plugin `{}` declares invalid namespace `{namespace}`",
                record.plugin_id
            )));
        }
        self.claim_namespace(record, &namespace, provider)?;
        registrations.namespace = Some(namespace.clone());

        self.configuration
            .factories()
            .register_factory(namespace.clone(), provider.factory());

        for definition in provider.models()? {
            if definition.namespace != namespace {
                return Err(HubError::provider(format!(
                    "model `{}` is outside namespace `{namespace}`",
                    definition.model_id()
                )));
            }
            let definition = Arc::new(definition);
            let replaced = self
                .configuration
                .models()
                .register_shared(Arc::clone(&definition));
            if let Some(previous) = &replaced {
                debug!(model = %previous.model_id(), "plugin definition shadows an existing one");
            }
            registrations.models.push(RegisteredModel {
                definition,
                replaced,
            });
        }

        for (key, handler) in provider.options_handlers() {
            if let Some(owner) = key.owner()
                && owner != namespace
            {
                return Err(HubError::provider(format!(
                    "options handler `{key}` is outside namespace `{namespace}`"
                )));
            }
            if let HandlerKey::Named(name) = &key {
                self.claim_handler_name(record, name, registrations)?;
            }
            let replaced = self
                .configuration
                .handlers()
                .register(key.clone(), Arc::clone(&handler));
            registrations.handlers.push(RegisteredHandler {
                key,
                handler,
                replaced,
            });
        }

        provider.on_enable(context).await
    }

    fn claim_namespace(
        &self,
        record: &PluginRecord,
        namespace: &str,
        provider: &Arc<dyn ProviderPlugin>,
    ) -> Result<(), HubError> {
        let handle = ProviderHandle {
            plugin_id: record.plugin_id.clone(),
            provider: Arc::clone(provider),
        };
        match self.providers.entry(namespace.to_string()) {
            Entry::Occupied(existing) if existing.get().plugin_id != record.plugin_id => {
                Err(HubError::provider(format!(
                    "namespace `{namespace}` is already provided by plugin `{}`",
                    existing.get().plugin_id
                )))
            }
            Entry::Occupied(mut existing) => {
                existing.insert(handle);
                Ok(())
            }
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    fn claim_handler_name(
        &self,
        record: &PluginRecord,
        name: &str,
        registrations: &mut Registrations,
    ) -> Result<(), HubError> {
        match self.handler_owners.entry(name.to_string()) {
            Entry::Occupied(owner) if owner.get() != &record.plugin_id => {
                Err(HubError::provider(format!(
                    "options handler `{name}` is already provided by plugin `{}`",
                    owner.get()
                )))
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(record.plugin_id.clone());
                registrations.handler_names.push(name.to_string());
                Ok(())
            }
        }
    }

    /// Removes this plugin's entries, newest first, restoring whatever each
    /// one replaced.
    fn unregister_models(&self, registrations: &Registrations) {
        let handlers = self.configuration.handlers();
        for registered in registrations.handlers.iter().rev() {
            handlers.restore(
                &registered.key,
                &registered.handler,
                registered.replaced.clone(),
            );
        }
        for name in &registrations.handler_names {
            self.handler_owners.remove(name);
        }

        let models = self.configuration.models();
        for registered in registrations.models.iter().rev() {
            models.restore_model(&registered.definition, registered.replaced.clone());
        }
    }

    fn release_namespace(&self, registrations: &Registrations) {
        if let Some(namespace) = &registrations.namespace {
            self.configuration.factories().unregister_factory(namespace);
            self.providers.remove(namespace);
        }
    }
}

#[async_trait]
impl PluginAdapter for ModelPluginAdapter {
    fn plugin_type(&self) -> PluginType {
        PluginType::Model
    }

    async fn on_install(&self, record: &PluginRecord) -> Result<(), HubError> {
        self.contexts.create(&record.plugin_id).await?;
        Ok(())
    }

    async fn on_enable(&self, record: &PluginRecord) -> Result<(), HubError> {
        if self.loaded.contains_key(&record.plugin_id) {
            debug!(plugin_id = %record.plugin_id, "provider already loaded");
            return Ok(());
        }

        let provider = self.loader.load(record).await?;
        let context = self.contexts.create(&record.plugin_id).await?;
        let mut registrations = Registrations::default();

        if let Err(e) = self
            .activate(record, &provider, &context, &mut registrations)
            .await
        {
            self.unregister_models(&registrations);
            self.release_namespace(&registrations);
            if let Err(dispose_err) = provider.dispose().await {
                warn!(
                    plugin_id = %record.plugin_id,
                    error = %dispose_err,
                    "provider dispose failed after enable error"
                );
            }
            return Err(e);
        }

        info!(
            plugin_id = %record.plugin_id,
            namespace = %provider.namespace(),
            models = registrations.models.len(),
            "model provider enabled"
        );
        self.loaded.insert(
            record.plugin_id.clone(),
            LoadedPlugin {
                provider,
                context,
                registrations,
            },
        );
        Ok(())
    }

    async fn on_disable(&self, record: &PluginRecord) -> Result<(), HubError> {
        let Some((_, loaded)) = self.loaded.remove(&record.plugin_id) else {
            debug!(plugin_id = %record.plugin_id, "provider not loaded, nothing to disable");
            return Ok(());
        };

        self.unregister_models(&loaded.registrations);
        let hook = loaded.provider.on_disable(&loaded.context).await;
        let disposed = loaded.provider.dispose().await;
        self.release_namespace(&loaded.registrations);

        info!(plugin_id = %record.plugin_id, "model provider disabled");
        hook.and(disposed)
    }

    async fn on_uninstall(&self, record: &PluginRecord) -> Result<(), HubError> {
        self.contexts.destroy(&record.plugin_id).await
    }
}

impl std::fmt::Debug for ModelPluginAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelPluginAdapter")
            .field("loaded", &self.loaded_plugins())
            .finish()
    }
}
