// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model registry and factory dispatch for the modelhub runtime.
//!
//! [`ModelConfiguration`] composes the definition, factory and options
//! handler registries. [`ModelClient`] resolves `namespace:name` ids against
//! it and caches one runtime model per id and kind.

pub mod client;
pub mod configuration;
pub mod factory;
pub mod options;
pub mod registry;

pub use client::{CacheKey, ModelClient, ModelHandle, parse_model_id};
pub use configuration::{Environment, ModelConfiguration};
pub use factory::{ModelFactory, ModelFactoryRegistry};
pub use options::{
    ChatOptionsHandler, EmbeddingOptionsHandler, HandlerKey, ImageOptionsHandler,
    OptionsHandlerRegistry, resolution_order,
};
pub use registry::{ModelKey, ModelRegistry};
