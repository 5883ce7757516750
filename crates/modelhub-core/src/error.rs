// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the modelhub plugin and model runtime.

use thiserror::Error;

use crate::types::{ModelType, PluginStatus};

/// The primary error type shared by the plugin lifecycle manager and the
/// model dispatch layer.
///
/// Precondition failures (`AlreadyInstalled`, `ValidationFailed`,
/// `NoAdapterForType`, `PluginNotFound`, `InvalidStateTransition`) are raised
/// before any state is mutated. The `Adapter*Failed` variants wrap the error
/// raised by a plugin adapter hook.
#[derive(Debug, Error)]
pub enum HubError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Filesystem errors while staging packages, icons or work directories.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The plugin package could not be read or does not contain a descriptor.
    #[error("invalid plugin package: {0}")]
    Package(String),

    /// A plugin with the same id is already installed.
    #[error("plugin `{plugin_id}` is already installed")]
    AlreadyInstalled { plugin_id: String },

    /// The plugin descriptor violated one or more validation rules.
    #[error("plugin validation failed: {}", .errors.join("; "))]
    ValidationFailed { errors: Vec<String> },

    /// No adapter is registered for the plugin type declared by the descriptor.
    #[error("no adapter registered for plugin type `{plugin_type}`")]
    NoAdapterForType { plugin_type: String },

    /// No plugin record exists for the given id.
    #[error("plugin `{plugin_id}` not found")]
    PluginNotFound { plugin_id: String },

    /// A lifecycle operation was attempted from an incompatible state.
    #[error("cannot {operation} plugin `{plugin_id}` while it is {status}")]
    InvalidStateTransition {
        plugin_id: String,
        operation: &'static str,
        status: PluginStatus,
    },

    /// The adapter install hook failed; the record is left `install_failed`.
    #[error("install of plugin `{plugin_id}` failed: {source}")]
    AdapterInstallFailed {
        plugin_id: String,
        source: Box<HubError>,
    },

    /// The adapter enable hook failed; the record was rolled back to `disabled`.
    #[error("enable of plugin `{plugin_id}` failed: {source}")]
    AdapterEnableFailed {
        plugin_id: String,
        source: Box<HubError>,
    },

    /// The adapter disable hook failed after caches were cleared.
    #[error("disable of plugin `{plugin_id}` failed: {source}")]
    AdapterDisableFailed {
        plugin_id: String,
        source: Box<HubError>,
    },

    /// The adapter uninstall hook failed; the record is left `uninstall_failed`.
    #[error("uninstall of plugin `{plugin_id}` failed: {source}")]
    AdapterUninstallFailed {
        plugin_id: String,
        source: Box<HubError>,
    },

    /// The entry point named by a plugin record has no registered constructor.
    #[error("entry point `{entry}` is not registered")]
    EntryPointNotFound { entry: String },

    /// No model definition is registered for the requested id.
    #[error("model `{model_id}` not found")]
    ModelNotFound { model_id: String },

    /// No model factory is registered for the namespace of the requested model.
    #[error("no model factory registered for namespace `{namespace}`")]
    NoFactoryForNamespace { namespace: String },

    /// Raw parameters were supplied but no options handler could be resolved.
    #[error("no options handler resolved for model `{model_id}`")]
    OptionsHandlerNotFound { model_id: String },

    /// The model id does not have the `namespace:name` shape.
    #[error("invalid model id `{0}`: expected `namespace:name`")]
    InvalidModelId(String),

    /// The namespace factory does not build models of the requested kind.
    #[error("factory for namespace `{namespace}` does not support {model_type} models")]
    UnsupportedModelType {
        namespace: String,
        model_type: ModelType,
    },

    /// The definition declares a different kind than the one requested.
    #[error("model `{model_id}` is a {actual} model, not {requested}")]
    ModelTypeMismatch {
        model_id: String,
        requested: ModelType,
        actual: ModelType,
    },

    /// Errors raised by a model provider or one of its runtime models.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        HubError::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a displayable storage failure.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        HubError::Storage {
            source: err.to_string().into(),
        }
    }
}
