// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model definition registry keyed by `(namespace, id)`.
//!
//! Registration is an upsert: the last write for a key wins and there is no
//! versioning. Definitions are held behind `Arc` so readers never observe a
//! half-written entry.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use modelhub_core::ModelDefinition;
use tracing::debug;

/// Registry key for a model definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelKey {
    pub namespace: String,
    pub id: String,
}

impl ModelKey {
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for ModelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.id)
    }
}

/// Thread-safe store of model definitions.
#[derive(Default)]
pub struct ModelRegistry {
    definitions: DashMap<ModelKey, Arc<ModelDefinition>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a definition. Returns the definition it replaced.
    pub fn register_model(&self, definition: ModelDefinition) -> Option<Arc<ModelDefinition>> {
        self.register_shared(Arc::new(definition))
    }

    /// Like [`register_model`](Self::register_model) for an already shared
    /// definition, so the caller can later recognize its own entry.
    pub fn register_shared(&self, definition: Arc<ModelDefinition>) -> Option<Arc<ModelDefinition>> {
        let key = ModelKey::new(&definition.namespace, &definition.id);
        debug!(model = %key, model_type = %definition.model_type, "registering model definition");
        self.definitions.insert(key, definition)
    }

    /// Undoes a [`register_shared`](Self::register_shared).
    ///
    /// Only acts while `current` is still the entry for its key: `previous`
    /// is put back, or the key is removed when there was none. Returns
    /// whether the entry was touched.
    pub fn restore_model(
        &self,
        current: &Arc<ModelDefinition>,
        previous: Option<Arc<ModelDefinition>>,
    ) -> bool {
        let key = ModelKey::new(&current.namespace, &current.id);
        match self.definitions.entry(key) {
            Entry::Occupied(mut entry) if Arc::ptr_eq(entry.get(), current) => {
                match previous {
                    Some(previous) => {
                        debug!(model = %entry.key(), "restoring replaced model definition");
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

    /// Looks up a definition. Absence is not an error at this layer.
    pub fn get_model_definition(&self, namespace: &str, id: &str) -> Option<Arc<ModelDefinition>> {
        self.definitions
            .get(&ModelKey::new(namespace, id))
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, namespace: &str, id: &str) -> bool {
        self.definitions.contains_key(&ModelKey::new(namespace, id))
    }

    pub fn unregister_model(&self, namespace: &str, id: &str) -> Option<Arc<ModelDefinition>> {
        let removed = self
            .definitions
            .remove(&ModelKey::new(namespace, id))
            .map(|(_, definition)| definition);
        if removed.is_some() {
            debug!(namespace, model = id, "unregistered model definition");
        }
        removed
    }

    /// Removes every definition of `namespace`. Returns how many were removed.
    pub fn unregister_namespace(&self, namespace: &str) -> usize {
        let before = self.definitions.len();
        self.definitions.retain(|key, _| key.namespace != namespace);
        before.saturating_sub(self.definitions.len())
    }

    /// All definitions, sorted by `(namespace, id)`.
    pub fn list(&self) -> Vec<Arc<ModelDefinition>> {
        self.sorted(|_| true)
    }

    /// Definitions of one namespace, sorted by id.
    pub fn list_namespace(&self, namespace: &str) -> Vec<Arc<ModelDefinition>> {
        self.sorted(|key| key.namespace == namespace)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn sorted(&self, filter: impl Fn(&ModelKey) -> bool) -> Vec<Arc<ModelDefinition>> {
        let mut entries: Vec<(ModelKey, Arc<ModelDefinition>)> = self
            .definitions
            .iter()
            .filter(|entry| filter(entry.key()))
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, definition)| definition).collect()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.definitions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelhub_core::ModelType;

    #[test]
    fn register_and_get_roundtrip() {
        let registry = ModelRegistry::new();
        registry.register_model(ModelDefinition::new("acme", "gpt", ModelType::Chat));

        let definition = registry.get_model_definition("acme", "gpt").unwrap();
        assert_eq!(definition.model_id(), "acme:gpt");
        assert!(registry.get_model_definition("acme", "missing").is_none());
        assert!(registry.get_model_definition("other", "gpt").is_none());
    }

    #[test]
    fn last_write_wins() {
        let registry = ModelRegistry::new();
        registry.register_model(ModelDefinition::new("acme", "gpt", ModelType::Chat));
        let replaced = registry.register_model(
            ModelDefinition::new("acme", "gpt", ModelType::Chat).with_endpoint("https://v2"),
        );

        assert!(replaced.unwrap().endpoint.is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry
                .get_model_definition("acme", "gpt")
                .unwrap()
                .endpoint
                .as_deref(),
            Some("https://v2")
        );
    }

    #[test]
    fn unregister_namespace_leaves_other_namespaces() {
        let registry = ModelRegistry::new();
        registry.register_model(ModelDefinition::new("acme", "gpt", ModelType::Chat));
        registry.register_model(ModelDefinition::new("acme", "draw", ModelType::Image));
        registry.register_model(ModelDefinition::new("other", "gpt", ModelType::Chat));

        assert_eq!(registry.unregister_namespace("acme"), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("other", "gpt"));
    }

    #[test]
    fn restore_puts_back_the_replaced_definition() {
        let registry = ModelRegistry::new();
        registry.register_model(ModelDefinition::new("acme", "gpt", ModelType::Chat));

        let ours = Arc::new(
            ModelDefinition::new("acme", "gpt", ModelType::Chat).with_endpoint("https://plugin"),
        );
        let previous = registry.register_shared(Arc::clone(&ours));
        assert!(registry.restore_model(&ours, previous));

        let restored = registry.get_model_definition("acme", "gpt").unwrap();
        assert!(restored.endpoint.is_none());
    }

    #[test]
    fn restore_leaves_a_newer_registration_alone() {
        let registry = ModelRegistry::new();
        let ours = Arc::new(ModelDefinition::new("acme", "gpt", ModelType::Chat));
        let previous = registry.register_shared(Arc::clone(&ours));
        registry.register_model(
            ModelDefinition::new("acme", "gpt", ModelType::Chat).with_endpoint("https://newer"),
        );

        assert!(!registry.restore_model(&ours, previous));
        assert!(registry.contains("acme", "gpt"));

        let fresh = Arc::new(ModelDefinition::new("acme", "draw", ModelType::Image));
        let previous = registry.register_shared(Arc::clone(&fresh));
        assert!(registry.restore_model(&fresh, previous));
        assert!(!registry.contains("acme", "draw"));
    }

    #[test]
    fn list_is_sorted() {
        let registry = ModelRegistry::new();
        registry.register_model(ModelDefinition::new("zeta", "a", ModelType::Chat));
        registry.register_model(ModelDefinition::new("acme", "b", ModelType::Chat));
        registry.register_model(ModelDefinition::new("acme", "a", ModelType::Chat));

        let ids: Vec<String> = registry.list().iter().map(|d| d.model_id()).collect();
        assert_eq!(ids, vec!["acme:a", "acme:b", "zeta:a"]);

        let acme: Vec<String> = registry
            .list_namespace("acme")
            .iter()
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(acme, vec!["a", "b"]);
    }
}
