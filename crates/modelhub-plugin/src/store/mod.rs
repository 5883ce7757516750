// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin record and plugin config persistence.
//!
//! [`MemoryPluginStore`] and [`MemoryConfigStore`] serve tests and ephemeral
//! hosts. [`SqlitePluginStore`] implements both traits over one database.

pub mod memory;
pub mod sqlite;

pub use memory::{MemoryConfigStore, MemoryPluginStore};
pub use sqlite::SqlitePluginStore;

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;
    use modelhub_core::{PluginRecord, PluginStatus, PluginType};

    pub(crate) fn record(plugin_id: &str, status: PluginStatus) -> PluginRecord {
        let now = Utc::now();
        PluginRecord {
            plugin_id: plugin_id.to_string(),
            name: format!("{plugin_id} plugin"),
            version: "1.0.0".to_string(),
            plugin_type: PluginType::Model,
            status,
            package_path: Some(format!("/var/lib/modelhub/packages/{plugin_id}-1.0.0.tar.gz").into()),
            main_entry: plugin_id.to_string(),
            icon_path: None,
            checksum: Some("ab".repeat(32)),
            installed_at: now,
            updated_at: now,
        }
    }
}
