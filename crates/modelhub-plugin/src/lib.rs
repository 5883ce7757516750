// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin packages, persistence, adapters and the lifecycle manager.
//!
//! A plugin arrives as a gzip-compressed tar archive carrying a
//! `plugin.toml` descriptor and an optional icon. The [`PluginManager`]
//! stages, validates and persists it, then drives it through
//! install/enable/disable/uninstall while the adapter registered for its
//! type performs the side effects. The [`ModelPluginAdapter`] turns an
//! enabled `model` plugin into factories, definitions and options handlers
//! in a shared [`modelhub_model::ModelConfiguration`].

pub mod adapter;
pub mod context;
pub mod descriptor;
pub mod events;
pub mod icon;
pub mod loader;
pub mod manager;
pub mod package;
pub mod provider;
pub mod store;
pub mod validation;

pub use adapter::{ModelPluginAdapter, PluginAdapter, ProviderHandle};
pub use context::{PluginContext, PluginContextFactory, PluginLogger, ScopedConfig};
pub use descriptor::{DESCRIPTOR_FILE, PluginDescriptor, PluginIcon, parse_descriptor};
pub use events::BroadcastPublisher;
pub use icon::FsIconStorage;
pub use loader::{EntryPointLoader, ProviderConstructor, StaticEntryPoints};
pub use manager::{PluginDirs, PluginManager, PluginManagerBuilder, ReconcileSummary};
pub use package::{ArchiveParser, PluginParser};
pub use provider::ProviderPlugin;
pub use store::{MemoryConfigStore, MemoryPluginStore, SqlitePluginStore};
pub use validation::{DEFAULT_MAX_ICON_BYTES, DescriptorValidator, PluginValidator};
