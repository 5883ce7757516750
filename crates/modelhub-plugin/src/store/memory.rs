// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process plugin and plugin-config stores.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use modelhub_core::{HubError, PluginConfigStore, PluginRecord, PluginStatus, PluginStore};

/// Plugin records held in a concurrent map. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryPluginStore {
    records: DashMap<String, PluginRecord>,
}

impl MemoryPluginStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(&self, filter: impl Fn(&PluginRecord) -> bool) -> Vec<PluginRecord> {
        let mut records: Vec<PluginRecord> = self
            .records
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.plugin_id.cmp(&b.plugin_id));
        records
    }
}

#[async_trait]
impl PluginStore for MemoryPluginStore {
    async fn insert(&self, record: &PluginRecord) -> Result<(), HubError> {
        match self.records.entry(record.plugin_id.clone()) {
            Entry::Occupied(_) => Err(HubError::AlreadyInstalled {
                plugin_id: record.plugin_id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, record: &PluginRecord) -> Result<(), HubError> {
        match self.records.get_mut(&record.plugin_id) {
            Some(mut existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(HubError::PluginNotFound {
                plugin_id: record.plugin_id.clone(),
            }),
        }
    }

    async fn get(&self, plugin_id: &str) -> Result<Option<PluginRecord>, HubError> {
        Ok(self.records.get(plugin_id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<PluginRecord>, HubError> {
        Ok(self.sorted(|_| true))
    }

    async fn list_by_status(&self, status: PluginStatus) -> Result<Vec<PluginRecord>, HubError> {
        Ok(self.sorted(|record| record.status == status))
    }

    async fn delete(&self, plugin_id: &str) -> Result<bool, HubError> {
        Ok(self.records.remove(plugin_id).is_some())
    }
}

/// Plugin config keyed by plugin id, then by key.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    values: DashMap<String, BTreeMap<String, String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginConfigStore for MemoryConfigStore {
    async fn get_config(&self, plugin_id: &str, key: &str) -> Result<Option<String>, HubError> {
        Ok(self
            .values
            .get(plugin_id)
            .and_then(|entries| entries.get(key).cloned()))
    }

    async fn set_config(&self, plugin_id: &str, key: &str, value: &str) -> Result<(), HubError> {
        self.values
            .entry(plugin_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_config(&self, plugin_id: &str, key: &str) -> Result<(), HubError> {
        if let Some(mut entries) = self.values.get_mut(plugin_id) {
            entries.remove(key);
        }
        Ok(())
    }

    async fn list_config(&self, plugin_id: &str) -> Result<BTreeMap<String, String>, HubError> {
        Ok(self
            .values
            .get(plugin_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default())
    }

    async fn clear_config(&self, plugin_id: &str) -> Result<(), HubError> {
        self.values.remove(plugin_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::record;

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let store = MemoryPluginStore::new();
        store.insert(&record("p1", PluginStatus::Installing)).await.unwrap();

        let err = store
            .insert(&record("p1", PluginStatus::Disabled))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::AlreadyInstalled { plugin_id } if plugin_id == "p1"));
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(
            store.get("p1").await.unwrap().unwrap().status,
            PluginStatus::Installing
        );
    }

    #[tokio::test]
    async fn update_requires_existing_record() {
        let store = MemoryPluginStore::new();
        let err = store
            .update(&record("ghost", PluginStatus::Disabled))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::PluginNotFound { .. }));
    }

    #[tokio::test]
    async fn list_by_status_filters_and_sorts() {
        let store = MemoryPluginStore::new();
        store.insert(&record("zeta", PluginStatus::Enabled)).await.unwrap();
        store.insert(&record("alpha", PluginStatus::Enabled)).await.unwrap();
        store.insert(&record("mid", PluginStatus::Disabled)).await.unwrap();

        let enabled: Vec<String> = store
            .list_by_status(PluginStatus::Enabled)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.plugin_id)
            .collect();
        assert_eq!(enabled, vec!["alpha", "zeta"]);
        assert!(store.delete("mid").await.unwrap());
        assert!(!store.delete("mid").await.unwrap());
    }

    #[tokio::test]
    async fn config_is_scoped_per_plugin() {
        let store = MemoryConfigStore::new();
        store.set_config("p1", "token", "a").await.unwrap();
        store.set_config("p2", "token", "b").await.unwrap();
        store.remove_config("p1", "missing").await.unwrap();

        assert_eq!(store.get_config("p1", "token").await.unwrap().as_deref(), Some("a"));
        store.clear_config("p1").await.unwrap();
        assert!(store.list_config("p1").await.unwrap().is_empty());
        assert_eq!(store.get_config("p2", "token").await.unwrap().as_deref(), Some("b"));
    }
}
