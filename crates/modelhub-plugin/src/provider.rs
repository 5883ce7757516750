// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The contract a model provider plugin implements.

use std::sync::Arc;

use async_trait::async_trait;
use modelhub_core::{HubError, ModelDefinition, OptionsHandler};
use modelhub_model::{HandlerKey, ModelFactory};

use crate::context::PluginContext;

/// A loaded model provider.
///
/// The model adapter drives an instance through `initialize`, registration
/// of its factory, models and options handlers, then `on_enable`. On
/// disable it calls `on_disable` followed by `dispose`.
#[async_trait]
pub trait ProviderPlugin: Send + Sync + 'static {
    /// Namespace owning every model this provider exposes.
    fn namespace(&self) -> &str;

    async fn initialize(&self, _context: &PluginContext) -> Result<(), HubError> {
        Ok(())
    }

    /// Factory registered under [`ProviderPlugin::namespace`].
    fn factory(&self) -> Arc<dyn ModelFactory>;

    /// Model definitions to register. Each must use the provider's namespace.
    fn models(&self) -> Result<Vec<ModelDefinition>, HubError>;

    /// Options handlers to register alongside the models.
    fn options_handlers(&self) -> Vec<(HandlerKey, Arc<dyn OptionsHandler>)> {
        Vec::new()
    }

    async fn on_enable(&self, _context: &PluginContext) -> Result<(), HubError> {
        Ok(())
    }

    async fn on_disable(&self, _context: &PluginContext) -> Result<(), HubError> {
        Ok(())
    }

    /// Releases resources held by the instance. The instance is dropped afterwards.
    async fn dispose(&self) -> Result<(), HubError> {
        Ok(())
    }
}
