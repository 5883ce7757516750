// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The model configuration facade.
//!
//! [`ModelConfiguration`] owns the model registry, the factory registry, the
//! options handler registry and the environment properties. One instance is
//! created at startup and shared by `Arc` with the plugin adapters and the
//! model client.

use std::collections::BTreeMap;

use modelhub_core::ModelDefinition;
use tracing::info;

use crate::factory::ModelFactoryRegistry;
use crate::options::OptionsHandlerRegistry;
use crate::registry::ModelRegistry;

/// String properties available to factories, typically credentials and
/// endpoints taken from the `[environment]` config section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    properties: BTreeMap<String, String>,
}

impl Environment {
    pub fn new(properties: BTreeMap<String, String>) -> Self {
        Self { properties }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl From<BTreeMap<String, String>> for Environment {
    fn from(properties: BTreeMap<String, String>) -> Self {
        Self::new(properties)
    }
}

#[derive(Debug)]
pub struct ModelConfiguration {
    models: ModelRegistry,
    factories: ModelFactoryRegistry,
    handlers: OptionsHandlerRegistry,
    environment: Environment,
}

impl Default for ModelConfiguration {
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

impl ModelConfiguration {
    /// Empty registries plus the built-in named options handlers.
    pub fn new(environment: Environment) -> Self {
        Self {
            models: ModelRegistry::new(),
            factories: ModelFactoryRegistry::new(),
            handlers: OptionsHandlerRegistry::with_builtin_handlers(),
            environment,
        }
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn factories(&self) -> &ModelFactoryRegistry {
        &self.factories
    }

    pub fn handlers(&self) -> &OptionsHandlerRegistry {
        &self.handlers
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Seeds definitions declared in `[[models]]`. These have no owning
    /// plugin and stay registered until the process exits.
    pub fn load_static_models(&self, definitions: &[ModelDefinition]) -> usize {
        for definition in definitions {
            self.models.register_model(definition.clone());
        }
        if !definitions.is_empty() {
            info!(count = definitions.len(), "loaded static model definitions");
        }
        definitions.len()
    }
}
