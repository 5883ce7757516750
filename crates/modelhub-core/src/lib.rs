// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the modelhub plugin and model runtime.
//!
//! This crate provides the error type, the shared plugin and model types, and
//! the capability traits consumed by the lifecycle manager (`modelhub-plugin`)
//! and the model dispatch layer (`modelhub-model`).

pub mod error;
pub mod model;
pub mod options;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::HubError;
pub use model::{
    ChatChunk, ChatMessage, ChatRequest, ChatResponse, ChatRole, EmbeddingRequest,
    EmbeddingResponse, GeneratedImage, ImageRequest, ImageResponse, ModelDefinition, Parameters,
    TokenUsage,
};
pub use options::{ChatOptions, EmbeddingOptions, ImageOptions, ModelOptions};
pub use traits::{
    ChatModel, ChatStream, EmbeddingModel, EventPublisher, IconStorage, ImageModel,
    OptionsHandler, PluginConfigStore, PluginStore,
};
pub use types::{
    AuthType, LifecycleEvent, LifecycleEventKind, ModelType, PluginRecord, PluginStatus,
    PluginType,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn plugin_status_round_trips_snake_case() {
        let statuses = [
            PluginStatus::Installing,
            PluginStatus::InstallFailed,
            PluginStatus::Disabled,
            PluginStatus::Enabling,
            PluginStatus::Enabled,
            PluginStatus::Disabling,
            PluginStatus::Uninstalling,
            PluginStatus::UninstallFailed,
        ];

        for status in statuses {
            let s = status.to_string();
            assert_eq!(PluginStatus::from_str(&s).unwrap(), status);
        }
        assert_eq!(PluginStatus::InstallFailed.to_string(), "install_failed");
        assert_eq!(PluginStatus::UninstallFailed.as_ref(), "uninstall_failed");
    }

    #[test]
    fn unknown_plugin_type_does_not_parse() {
        assert_eq!(PluginType::from_str("model").unwrap(), PluginType::Model);
        assert!(PluginType::from_str("widget").is_err());
    }

    #[test]
    fn uninstall_is_allowed_from_rest_states_only() {
        assert!(PluginStatus::Disabled.is_uninstallable());
        assert!(PluginStatus::Enabled.is_uninstallable());
        assert!(PluginStatus::InstallFailed.is_uninstallable());
        assert!(PluginStatus::UninstallFailed.is_uninstallable());
        assert!(!PluginStatus::Enabling.is_uninstallable());
        assert!(!PluginStatus::Uninstalling.is_uninstallable());
    }

    #[test]
    fn model_definition_deserializes_with_defaults() {
        let json = r#"{"id": "gpt", "namespace": "acme", "type": "chat"}"#;
        let definition: ModelDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(definition.model_id(), "acme:gpt");
        assert_eq!(definition.model_type, ModelType::Chat);
        assert_eq!(definition.auth_type, AuthType::None);
        assert!(definition.options.is_empty());
        assert!(definition.options_handler.is_none());
    }

    #[test]
    fn adapter_failures_keep_their_source() {
        use std::error::Error;

        let err = HubError::AdapterEnableFailed {
            plugin_id: "p1".into(),
            source: Box::new(HubError::provider("boom")),
        };
        assert_eq!(err.to_string(), "enable of plugin `p1` failed: provider error: boom");
        assert!(err.source().is_some());
    }

    #[test]
    fn invalid_transition_names_the_status() {
        let err = HubError::InvalidStateTransition {
            plugin_id: "p1".into(),
            operation: "enable",
            status: PluginStatus::Enabled,
        };
        assert_eq!(err.to_string(), "cannot enable plugin `p1` while it is enabled");
    }
}
