// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Options handler registry with tiered resolution.
//!
//! A handler turns raw caller parameters into a typed [`ModelOptions`]. For a
//! given model the registry is consulted in this order, stopping at the
//! first hit:
//!
//! 1. the handler explicitly named by the model definition,
//! 2. a handler registered for `namespace:modelId`,
//! 3. a handler registered for `namespace:type`.
//!
//! When none matches, the caller gets no handler. The order itself lives in
//! [`resolution_order`] so it can be tested without any storage.

use std::fmt;
use std::sync::Arc;

use std::hash::Hash;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use modelhub_core::{HubError, ModelDefinition, ModelOptions, ModelType, OptionsHandler, Parameters};
use serde_json::Value;
use tracing::{debug, warn};

/// Where a handler is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandlerKey {
    /// A handler addressed by name from a definition's `options_handler`.
    Named(String),
    /// A handler for one model, `namespace:modelId`.
    Model { namespace: String, model_id: String },
    /// A handler for every model of a kind in a namespace, `namespace:type`.
    Namespace {
        namespace: String,
        model_type: ModelType,
    },
}

impl HandlerKey {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn model(namespace: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self::Model {
            namespace: namespace.into(),
            model_id: model_id.into(),
        }
    }

    pub fn namespace(namespace: impl Into<String>, model_type: ModelType) -> Self {
        Self::Namespace {
            namespace: namespace.into(),
            model_type,
        }
    }

    /// Namespace the key belongs to. Named handlers are global.
    pub fn owner(&self) -> Option<&str> {
        match self {
            Self::Named(_) => None,
            Self::Model { namespace, .. } | Self::Namespace { namespace, .. } => Some(namespace),
        }
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Model {
                namespace,
                model_id,
            } => write!(f, "{namespace}:{model_id}"),
            Self::Namespace {
                namespace,
                model_type,
            } => write!(f, "{namespace}:{model_type}"),
        }
    }
}

/// Keys to try, highest precedence first.
pub fn resolution_order(
    namespace: &str,
    model_id: &str,
    model_type: ModelType,
    explicit: Option<&str>,
) -> Vec<HandlerKey> {
    let mut order = Vec::with_capacity(3);
    if let Some(name) = explicit.filter(|name| !name.is_empty()) {
        order.push(HandlerKey::named(name));
    }
    order.push(HandlerKey::model(namespace, model_id));
    order.push(HandlerKey::namespace(namespace, model_type));
    order
}

/// Thread-safe handler store.
///
/// Each tier has its own map, so a named handler can never shadow a
/// `namespace:modelId` entry that happens to render to the same string.
#[derive(Default)]
pub struct OptionsHandlerRegistry {
    named: DashMap<String, Arc<dyn OptionsHandler>>,
    by_model: DashMap<(String, String), Arc<dyn OptionsHandler>>,
    by_type: DashMap<(String, ModelType), Arc<dyn OptionsHandler>>,
}

impl OptionsHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in serde handlers registered by name.
    pub fn with_builtin_handlers() -> Self {
        let registry = Self::new();
        registry.register(HandlerKey::named(ChatOptionsHandler::NAME), Arc::new(ChatOptionsHandler));
        registry.register(HandlerKey::named(ImageOptionsHandler::NAME), Arc::new(ImageOptionsHandler));
        registry.register(
            HandlerKey::named(EmbeddingOptionsHandler::NAME),
            Arc::new(EmbeddingOptionsHandler),
        );
        registry
    }

    /// Registers `handler` at `key`. Returns the handler it replaced.
    pub fn register(
        &self,
        key: HandlerKey,
        handler: Arc<dyn OptionsHandler>,
    ) -> Option<Arc<dyn OptionsHandler>> {
        debug!(key = %key, "registering options handler");
        match key {
            HandlerKey::Named(name) => self.named.insert(name, handler),
            HandlerKey::Model {
                namespace,
                model_id,
            } => self.by_model.insert((namespace, model_id), handler),
            HandlerKey::Namespace {
                namespace,
                model_type,
            } => self.by_type.insert((namespace, model_type), handler),
        }
    }

    /// Undoes a [`register`](Self::register) while `current` is still the
    /// handler at `key`: `previous` goes back in, or the key is removed.
    /// Returns whether the entry was touched.
    pub fn restore(
        &self,
        key: &HandlerKey,
        current: &Arc<dyn OptionsHandler>,
        previous: Option<Arc<dyn OptionsHandler>>,
    ) -> bool {
        match key {
            HandlerKey::Named(name) => restore_entry(&self.named, name.clone(), current, previous),
            HandlerKey::Model {
                namespace,
                model_id,
            } => restore_entry(
                &self.by_model,
                (namespace.clone(), model_id.clone()),
                current,
                previous,
            ),
            HandlerKey::Namespace {
                namespace,
                model_type,
            } => restore_entry(
                &self.by_type,
                (namespace.clone(), *model_type),
                current,
                previous,
            ),
        }
    }

    pub fn unregister(&self, key: &HandlerKey) -> Option<Arc<dyn OptionsHandler>> {
        match key {
            HandlerKey::Named(name) => self.named.remove(name).map(|(_, h)| h),
            HandlerKey::Model {
                namespace,
                model_id,
            } => self
                .by_model
                .remove(&(namespace.clone(), model_id.clone()))
                .map(|(_, h)| h),
            HandlerKey::Namespace {
                namespace,
                model_type,
            } => self
                .by_type
                .remove(&(namespace.clone(), *model_type))
                .map(|(_, h)| h),
        }
    }

    /// Drops the model-level and namespace-level handlers of `namespace`.
    pub fn unregister_namespace(&self, namespace: &str) {
        self.by_model.retain(|(ns, _), _| ns != namespace);
        self.by_type.retain(|(ns, _), _| ns != namespace);
    }

    pub fn get(&self, key: &HandlerKey) -> Option<Arc<dyn OptionsHandler>> {
        match key {
            HandlerKey::Named(name) => self.named.get(name).map(|e| Arc::clone(e.value())),
            HandlerKey::Model {
                namespace,
                model_id,
            } => self
                .by_model
                .get(&(namespace.clone(), model_id.clone()))
                .map(|e| Arc::clone(e.value())),
            HandlerKey::Namespace {
                namespace,
                model_type,
            } => self
                .by_type
                .get(&(namespace.clone(), *model_type))
                .map(|e| Arc::clone(e.value())),
        }
    }

    /// First registered handler along [`resolution_order`], if any.
    pub fn resolve_handler(
        &self,
        namespace: &str,
        model_id: &str,
        model_type: ModelType,
        explicit: Option<&str>,
    ) -> Option<Arc<dyn OptionsHandler>> {
        for key in resolution_order(namespace, model_id, model_type, explicit) {
            if let Some(handler) = self.get(&key) {
                debug!(handler = %key, "resolved options handler");
                return Some(handler);
            }
            if matches!(key, HandlerKey::Named(_)) {
                warn!(
                    handler = %key,
                    namespace,
                    model = model_id,
                    "named options handler is not registered, falling back"
                );
            }
        }
        None
    }
}

fn restore_entry<K: Eq + Hash>(
    map: &DashMap<K, Arc<dyn OptionsHandler>>,
    key: K,
    current: &Arc<dyn OptionsHandler>,
    previous: Option<Arc<dyn OptionsHandler>>,
) -> bool {
    match map.entry(key) {
        Entry::Occupied(mut entry) if Arc::ptr_eq(entry.get(), current) => {
            match previous {
                Some(previous) => {
                    entry.insert(previous);
                }
                None => {
                    entry.remove();
                }
            }
            true
        }
        _ => false,
    }
}

impl fmt::Debug for OptionsHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsHandlerRegistry")
            .field("named", &self.named.len())
            .field("by_model", &self.by_model.len())
            .field("by_type", &self.by_type.len())
            .finish()
    }
}

/// Merges caller parameters over the definition's defaults.
fn merged(definition: &ModelDefinition, parameters: &Parameters) -> Parameters {
    let mut merged = definition.options.clone();
    for (key, value) in parameters {
        merged.insert(key.clone(), value.clone());
    }
    merged
        .entry("model".to_string())
        .or_insert_with(|| Value::String(definition.id.clone()));
    merged
}

fn build(
    model_type: ModelType,
    definition: &ModelDefinition,
    parameters: &Parameters,
) -> Result<ModelOptions, HubError> {
    ModelOptions::from_parameters(model_type, &merged(definition, parameters))
}

/// Deserializes [`modelhub_core::ChatOptions`] from merged parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChatOptionsHandler;

impl ChatOptionsHandler {
    pub const NAME: &'static str = "chat";
}

impl OptionsHandler for ChatOptionsHandler {
    fn build_options(
        &self,
        definition: &ModelDefinition,
        parameters: &Parameters,
    ) -> Result<ModelOptions, HubError> {
        build(ModelType::Chat, definition, parameters)
    }
}

/// Deserializes [`modelhub_core::ImageOptions`] from merged parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageOptionsHandler;

impl ImageOptionsHandler {
    pub const NAME: &'static str = "image";
}

impl OptionsHandler for ImageOptionsHandler {
    fn build_options(
        &self,
        definition: &ModelDefinition,
        parameters: &Parameters,
    ) -> Result<ModelOptions, HubError> {
        build(ModelType::Image, definition, parameters)
    }
}

/// Deserializes [`modelhub_core::EmbeddingOptions`] from merged parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddingOptionsHandler;

impl EmbeddingOptionsHandler {
    pub const NAME: &'static str = "embedding";
}

impl OptionsHandler for EmbeddingOptionsHandler {
    fn build_options(
        &self,
        definition: &ModelDefinition,
        parameters: &Parameters,
    ) -> Result<ModelOptions, HubError> {
        build(ModelType::Embedding, definition, parameters)
    }
}
