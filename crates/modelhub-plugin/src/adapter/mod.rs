// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Type-specific lifecycle side effects.
//!
//! The manager owns the state machine and persistence; an adapter performs
//! what a transition means for one plugin type. Every hook receives the
//! current record and must leave no partial registrations behind on error.

pub mod model;

use async_trait::async_trait;
use modelhub_core::{HubError, PluginRecord, PluginType};

pub use model::{ModelPluginAdapter, ProviderHandle};

#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    fn plugin_type(&self) -> PluginType;

    async fn on_install(&self, record: &PluginRecord) -> Result<(), HubError>;

    async fn on_enable(&self, record: &PluginRecord) -> Result<(), HubError>;

    /// Tears down what `on_enable` set up. In-memory state is released even
    /// when an error is returned.
    async fn on_disable(&self, record: &PluginRecord) -> Result<(), HubError>;

    async fn on_uninstall(&self, record: &PluginRecord) -> Result<(), HubError>;
}
