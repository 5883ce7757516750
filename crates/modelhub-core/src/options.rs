// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed invocation options produced by options handlers.
//!
//! Each kind carries the knobs common to most providers plus an `extra`
//! map for provider-specific keys, so unknown parameters survive conversion.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HubError;
use crate::model::Parameters;
use crate::types::ModelType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(flatten)]
    pub extra: Parameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    #[serde(flatten)]
    pub extra: Parameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
    #[serde(flatten)]
    pub extra: Parameters,
}

/// Strongly-typed runtime options handed to a model invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelOptions {
    Chat(ChatOptions),
    Image(ImageOptions),
    Embedding(EmbeddingOptions),
}

impl ModelOptions {
    /// Converts raw parameters into the typed options for `model_type`.
    pub fn from_parameters(model_type: ModelType, parameters: &Parameters) -> Result<Self, HubError> {
        let value = Value::Object(parameters.clone());
        let converted = match model_type {
            ModelType::Chat => serde_json::from_value(value).map(ModelOptions::Chat),
            ModelType::Image => serde_json::from_value(value).map(ModelOptions::Image),
            ModelType::Embedding => serde_json::from_value(value).map(ModelOptions::Embedding),
        };
        converted.map_err(|e| HubError::Provider {
            message: format!("invalid {model_type} parameters: {e}"),
            source: Some(Box::new(e)),
        })
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            ModelOptions::Chat(_) => ModelType::Chat,
            ModelOptions::Image(_) => ModelType::Image,
            ModelOptions::Embedding(_) => ModelType::Embedding,
        }
    }

    pub fn as_chat(&self) -> Option<&ChatOptions> {
        match self {
            ModelOptions::Chat(options) => Some(options),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageOptions> {
        match self {
            ModelOptions::Image(options) => Some(options),
            _ => None,
        }
    }

    pub fn as_embedding(&self) -> Option<&EmbeddingOptions> {
        match self {
            ModelOptions::Embedding(options) => Some(options),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Parameters {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn chat_parameters_keep_unknown_keys_in_extra() {
        let options = ModelOptions::from_parameters(
            ModelType::Chat,
            &params(json!({"temperature": 0.2, "max_tokens": 64, "seed": 7})),
        )
        .unwrap();

        let chat = options.as_chat().unwrap();
        assert_eq!(chat.temperature, Some(0.2));
        assert_eq!(chat.max_tokens, Some(64));
        assert_eq!(chat.extra.get("seed"), Some(&json!(7)));
    }

    #[test]
    fn wrong_parameter_type_is_rejected() {
        let err = ModelOptions::from_parameters(
            ModelType::Image,
            &params(json!({"n": "many"})),
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid image parameters"));
    }

    #[test]
    fn embedding_options_report_their_kind() {
        let options =
            ModelOptions::from_parameters(ModelType::Embedding, &params(json!({"dimensions": 256})))
                .unwrap();
        assert_eq!(options.model_type(), ModelType::Embedding);
        assert_eq!(options.as_embedding().unwrap().dimensions, Some(256));
        assert!(options.as_chat().is_none());
    }
}
