// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits at the seams between the core and its collaborators.
//!
//! Runtime models, options handlers, plugin persistence, icon storage and
//! event publication are all consumed through these traits. All async traits
//! use `#[async_trait]` for dynamic dispatch compatibility.

pub mod events;
pub mod icon;
pub mod model;
pub mod options;
pub mod storage;

pub use events::EventPublisher;
pub use icon::IconStorage;
pub use model::{ChatModel, ChatStream, EmbeddingModel, ImageModel};
pub use options::OptionsHandler;
pub use storage::{PluginConfigStore, PluginStore};
