// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock provider plugin with injectable failures.

use std::sync::Arc;

use async_trait::async_trait;
use modelhub_core::{HubError, ModelDefinition, ModelType, OptionsHandler};
use modelhub_model::{HandlerKey, ModelFactory};
use modelhub_plugin::{PluginContext, ProviderPlugin};
use tokio::sync::Mutex;

use crate::mock_model::MockFactory;

/// Provider hook that a [`MockProviderPlugin`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Initialize,
    OnEnable,
    OnDisable,
    Dispose,
}

/// A provider plugin serving one namespace through a [`MockFactory`].
///
/// Records the name of every lifecycle hook it receives.
pub struct MockProviderPlugin {
    namespace: String,
    factory: Arc<MockFactory>,
    models: Vec<ModelDefinition>,
    handlers: Vec<(HandlerKey, Arc<dyn OptionsHandler>)>,
    failure: Option<FailurePoint>,
    hooks: Mutex<Vec<&'static str>>,
}

impl MockProviderPlugin {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            factory: Arc::new(MockFactory::all()),
            models: Vec::new(),
            handlers: Vec::new(),
            failure: None,
            hooks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_factory(mut self, factory: Arc<MockFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Adds a model definition as-is, even one outside this namespace.
    pub fn with_definition(mut self, definition: ModelDefinition) -> Self {
        self.models.push(definition);
        self
    }

    /// Adds a model `id` of `model_type` in this provider's namespace.
    pub fn with_model(self, id: &str, model_type: ModelType) -> Self {
        let definition = ModelDefinition::new(self.namespace.clone(), id, model_type);
        self.with_definition(definition)
    }

    pub fn with_handler(mut self, key: HandlerKey, handler: Arc<dyn OptionsHandler>) -> Self {
        self.handlers.push((key, handler));
        self
    }

    pub fn failing_at(mut self, point: FailurePoint) -> Self {
        self.failure = Some(point);
        self
    }

    pub fn mock_factory(&self) -> &Arc<MockFactory> {
        &self.factory
    }

    /// Hooks received so far, in order.
    pub async fn hooks(&self) -> Vec<&'static str> {
        self.hooks.lock().await.clone()
    }

    async fn hook(&self, name: &'static str, point: FailurePoint) -> Result<(), HubError> {
        self.hooks.lock().await.push(name);
        if self.failure == Some(point) {
            return Err(HubError::provider(format!(
                "{name} failed for namespace `{}`",
                self.namespace
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderPlugin for MockProviderPlugin {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn initialize(&self, _context: &PluginContext) -> Result<(), HubError> {
        self.hook("initialize", FailurePoint::Initialize).await
    }

    fn factory(&self) -> Arc<dyn ModelFactory> {
        self.factory.clone()
    }

    fn models(&self) -> Result<Vec<ModelDefinition>, HubError> {
        Ok(self.models.clone())
    }

    fn options_handlers(&self) -> Vec<(HandlerKey, Arc<dyn OptionsHandler>)> {
        self.handlers.clone()
    }

    async fn on_enable(&self, _context: &PluginContext) -> Result<(), HubError> {
        self.hook("on_enable", FailurePoint::OnEnable).await
    }

    async fn on_disable(&self, _context: &PluginContext) -> Result<(), HubError> {
        self.hook("on_disable", FailurePoint::OnDisable).await
    }

    async fn dispose(&self) -> Result<(), HubError> {
        self.hook("dispose", FailurePoint::Dispose).await
    }
}
