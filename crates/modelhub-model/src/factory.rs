// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model factories and the namespace-keyed factory registry.

use std::sync::Arc;

use dashmap::DashMap;
use modelhub_core::{ChatModel, EmbeddingModel, HubError, ImageModel, ModelDefinition, ModelType};
use tracing::debug;

use crate::configuration::ModelConfiguration;

/// Builds runtime model objects for one namespace.
///
/// A factory advertises the kinds it can build through [`ModelFactory::supports`].
/// Callers check it before invoking a create method; the default create
/// methods report [`HubError::UnsupportedModelType`].
pub trait ModelFactory: Send + Sync + 'static {
    fn supports(&self, model_type: ModelType) -> bool;

    fn create_chat_model(
        &self,
        definition: &ModelDefinition,
        _configuration: &ModelConfiguration,
    ) -> Result<Arc<dyn ChatModel>, HubError> {
        Err(unsupported(definition, ModelType::Chat))
    }

    fn create_image_model(
        &self,
        definition: &ModelDefinition,
        _configuration: &ModelConfiguration,
    ) -> Result<Arc<dyn ImageModel>, HubError> {
        Err(unsupported(definition, ModelType::Image))
    }

    fn create_embedding_model(
        &self,
        definition: &ModelDefinition,
        _configuration: &ModelConfiguration,
    ) -> Result<Arc<dyn EmbeddingModel>, HubError> {
        Err(unsupported(definition, ModelType::Embedding))
    }
}

fn unsupported(definition: &ModelDefinition, model_type: ModelType) -> HubError {
    HubError::UnsupportedModelType {
        namespace: definition.namespace.clone(),
        model_type,
    }
}

/// One factory per namespace; the last registration wins.
#[derive(Default)]
pub struct ModelFactoryRegistry {
    factories: DashMap<String, Arc<dyn ModelFactory>>,
}

impl ModelFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `namespace`, returning the factory it replaced.
    pub fn register_factory(
        &self,
        namespace: impl Into<String>,
        factory: Arc<dyn ModelFactory>,
    ) -> Option<Arc<dyn ModelFactory>> {
        let namespace = namespace.into();
        debug!(namespace = %namespace, "registering model factory");
        self.factories.insert(namespace, factory)
    }

    pub fn get_factory(&self, namespace: &str) -> Option<Arc<dyn ModelFactory>> {
        self.factories
            .get(namespace)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn unregister_factory(&self, namespace: &str) -> Option<Arc<dyn ModelFactory>> {
        self.factories.remove(namespace).map(|(_, factory)| factory)
    }

    /// Registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> =
            self.factories.iter().map(|entry| entry.key().clone()).collect();
        namespaces.sort();
        namespaces
    }
}

impl std::fmt::Debug for ModelFactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFactoryRegistry")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
