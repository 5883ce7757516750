// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model dispatch: resolves `namespace:name` ids to cached runtime models.
//!
//! Each `(model id, kind)` pair owns one `OnceCell`. Concurrent first callers
//! wait on the same cell, so a factory create method runs at most once per
//! key until [`ModelClient::close`] clears the cache. The cache is not
//! invalidated when a plugin is disabled; a later call for a removed
//! definition still fails because the definition lookup runs first.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use modelhub_core::{
    ChatModel, ChatRequest, ChatResponse, ChatStream, EmbeddingModel, EmbeddingRequest,
    EmbeddingResponse, HubError, ImageModel, ImageRequest, ImageResponse, ModelDefinition,
    ModelOptions, ModelType, Parameters,
};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::configuration::ModelConfiguration;

/// Cache key, displayed as `modelId:kind`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub model_id: String,
    pub kind: ModelType,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.model_id, self.kind)
    }
}

/// A constructed runtime model.
#[derive(Clone)]
pub enum ModelHandle {
    Chat(Arc<dyn ChatModel>),
    Image(Arc<dyn ImageModel>),
    Embedding(Arc<dyn EmbeddingModel>),
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ModelHandle::Chat(_) => "chat",
            ModelHandle::Image(_) => "image",
            ModelHandle::Embedding(_) => "embedding",
        };
        f.debug_tuple("ModelHandle").field(&kind).finish()
    }
}

/// Splits `namespace:name` on the first separator.
pub fn parse_model_id(model_id: &str) -> Result<(&str, &str), HubError> {
    match model_id.split_once(':') {
        Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
            Ok((namespace, name))
        }
        _ => Err(HubError::InvalidModelId(model_id.to_string())),
    }
}

pub struct ModelClient {
    configuration: Arc<ModelConfiguration>,
    cache: DashMap<CacheKey, Arc<OnceCell<ModelHandle>>>,
}

impl ModelClient {
    pub fn new(configuration: Arc<ModelConfiguration>) -> Self {
        Self {
            configuration,
            cache: DashMap::new(),
        }
    }

    pub fn configuration(&self) -> &Arc<ModelConfiguration> {
        &self.configuration
    }

    pub async fn resolve_chat(&self, model_id: &str) -> Result<Arc<dyn ChatModel>, HubError> {
        let (_, handle) = self.resolve(model_id, ModelType::Chat).await?;
        match handle {
            ModelHandle::Chat(model) => Ok(model),
            other => Err(mismatched(model_id, ModelType::Chat, &other)),
        }
    }

    pub async fn resolve_image(&self, model_id: &str) -> Result<Arc<dyn ImageModel>, HubError> {
        let (_, handle) = self.resolve(model_id, ModelType::Image).await?;
        match handle {
            ModelHandle::Image(model) => Ok(model),
            other => Err(mismatched(model_id, ModelType::Image, &other)),
        }
    }

    pub async fn resolve_embedding(
        &self,
        model_id: &str,
    ) -> Result<Arc<dyn EmbeddingModel>, HubError> {
        let (_, handle) = self.resolve(model_id, ModelType::Embedding).await?;
        match handle {
            ModelHandle::Embedding(model) => Ok(model),
            other => Err(mismatched(model_id, ModelType::Embedding, &other)),
        }
    }

    #[instrument(skip_all, fields(model_id = %model_id))]
    pub async fn chat(&self, model_id: &str, request: ChatRequest) -> Result<ChatResponse, HubError> {
        let (definition, handle) = self.resolve(model_id, ModelType::Chat).await?;
        let model = match handle {
            ModelHandle::Chat(model) => model,
            other => return Err(mismatched(model_id, ModelType::Chat, &other)),
        };
        let options = self.runtime_options(&definition, request.parameters.as_ref())?;
        model.call(request, options).await
    }

    /// Streams partial chat results from the underlying model as they arrive.
    #[instrument(skip_all, fields(model_id = %model_id))]
    pub async fn chat_stream(
        &self,
        model_id: &str,
        request: ChatRequest,
    ) -> Result<ChatStream, HubError> {
        let (definition, handle) = self.resolve(model_id, ModelType::Chat).await?;
        let model = match handle {
            ModelHandle::Chat(model) => model,
            other => return Err(mismatched(model_id, ModelType::Chat, &other)),
        };
        let options = self.runtime_options(&definition, request.parameters.as_ref())?;
        model.stream(request, options).await
    }

    #[instrument(skip_all, fields(model_id = %model_id))]
    pub async fn generate_image(
        &self,
        model_id: &str,
        request: ImageRequest,
    ) -> Result<ImageResponse, HubError> {
        let (definition, handle) = self.resolve(model_id, ModelType::Image).await?;
        let model = match handle {
            ModelHandle::Image(model) => model,
            other => return Err(mismatched(model_id, ModelType::Image, &other)),
        };
        let options = self.runtime_options(&definition, request.parameters.as_ref())?;
        model.generate(request, options).await
    }

    #[instrument(skip_all, fields(model_id = %model_id))]
    pub async fn embedding(
        &self,
        model_id: &str,
        request: EmbeddingRequest,
    ) -> Result<EmbeddingResponse, HubError> {
        let (definition, handle) = self.resolve(model_id, ModelType::Embedding).await?;
        let model = match handle {
            ModelHandle::Embedding(model) => model,
            other => return Err(mismatched(model_id, ModelType::Embedding, &other)),
        };
        let options = self.runtime_options(&definition, request.parameters.as_ref())?;
        model.embed(request, options).await
    }

    /// Whether `model_id` has a definition and a factory that can build it.
    /// Does not construct the model.
    pub fn is_model_available(&self, model_id: &str) -> bool {
        let Ok((namespace, name)) = parse_model_id(model_id) else {
            return false;
        };
        let Some(definition) = self
            .configuration
            .models()
            .get_model_definition(namespace, name)
        else {
            return false;
        };
        self.configuration
            .factories()
            .get_factory(namespace)
            .is_some_and(|factory| factory.supports(definition.model_type))
    }

    /// Number of constructed models currently cached.
    pub fn cached_models(&self) -> usize {
        self.cache.iter().filter(|entry| entry.value().initialized()).count()
    }

    /// Drops every cached model. Later calls rebuild from the registries.
    pub fn close(&self) {
        let dropped = self.cache.len();
        self.cache.clear();
        debug!(dropped, "model client cache cleared");
    }

    async fn resolve(
        &self,
        model_id: &str,
        kind: ModelType,
    ) -> Result<(Arc<ModelDefinition>, ModelHandle), HubError> {
        let (namespace, name) = parse_model_id(model_id)?;
        let definition = self
            .configuration
            .models()
            .get_model_definition(namespace, name)
            .ok_or_else(|| HubError::ModelNotFound {
                model_id: model_id.to_string(),
            })?;
        if definition.model_type != kind {
            return Err(HubError::ModelTypeMismatch {
                model_id: model_id.to_string(),
                requested: kind,
                actual: definition.model_type,
            });
        }

        let key = CacheKey {
            model_id: model_id.to_string(),
            kind,
        };
        // Clone the cell out so the shard lock is released before awaiting.
        let cell = Arc::clone(self.cache.entry(key).or_default().value());
        let handle = cell
            .get_or_try_init(|| async { self.build(&definition, kind) })
            .await?
            .clone();
        Ok((definition, handle))
    }

    fn build(&self, definition: &ModelDefinition, kind: ModelType) -> Result<ModelHandle, HubError> {
        let factory = self
            .configuration
            .factories()
            .get_factory(&definition.namespace)
            .ok_or_else(|| HubError::NoFactoryForNamespace {
                namespace: definition.namespace.clone(),
            })?;
        if !factory.supports(kind) {
            return Err(HubError::UnsupportedModelType {
                namespace: definition.namespace.clone(),
                model_type: kind,
            });
        }

        debug!(model = %definition.model_id(), %kind, "constructing runtime model");
        let configuration = self.configuration.as_ref();
        let handle = match kind {
            ModelType::Chat => ModelHandle::Chat(factory.create_chat_model(definition, configuration)?),
            ModelType::Image => {
                ModelHandle::Image(factory.create_image_model(definition, configuration)?)
            }
            ModelType::Embedding => {
                ModelHandle::Embedding(factory.create_embedding_model(definition, configuration)?)
            }
        };
        Ok(handle)
    }

    /// `None` when the caller sent no parameters; otherwise the resolved
    /// handler's output. A missing handler is an error in that case.
    fn runtime_options(
        &self,
        definition: &ModelDefinition,
        parameters: Option<&Parameters>,
    ) -> Result<Option<ModelOptions>, HubError> {
        let Some(parameters) = parameters else {
            return Ok(None);
        };
        let handler = self
            .configuration
            .handlers()
            .resolve_handler(
                &definition.namespace,
                &definition.id,
                definition.model_type,
                definition.options_handler.as_deref(),
            )
            .ok_or_else(|| HubError::OptionsHandlerNotFound {
                model_id: definition.model_id(),
            })?;
        handler.build_options(definition, parameters).map(Some)
    }
}

impl fmt::Debug for ModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClient")
            .field("cached", &self.cache.len())
            .finish()
    }
}

fn mismatched(model_id: &str, requested: ModelType, handle: &ModelHandle) -> HubError {
    let actual = match handle {
        ModelHandle::Chat(_) => ModelType::Chat,
        ModelHandle::Image(_) => ModelType::Image,
        ModelHandle::Embedding(_) => ModelType::Embedding,
    };
    HubError::ModelTypeMismatch {
        model_id: model_id.to_string(),
        requested,
        actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_first_separator() {
        assert_eq!(parse_model_id("acme:gpt").unwrap(), ("acme", "gpt"));
        assert_eq!(parse_model_id("acme:org/model:v2").unwrap(), ("acme", "org/model:v2"));
    }

    #[test]
    fn parse_rejects_ids_without_namespace() {
        for id in ["gpt", ":gpt", "acme:", ""] {
            assert!(
                matches!(parse_model_id(id), Err(HubError::InvalidModelId(_))),
                "{id} should be rejected"
            );
        }
    }

    #[test]
    fn cache_key_display() {
        let key = CacheKey {
            model_id: "acme:gpt".to_string(),
            kind: ModelType::Chat,
        };
        assert_eq!(key.to_string(), "acme:gpt:chat");
    }

    #[tokio::test]
    async fn invalid_id_fails_before_lookup() {
        let client = ModelClient::new(Arc::new(ModelConfiguration::default()));
        let err = client
            .chat("gpt", ChatRequest::new(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::InvalidModelId(id) if id == "gpt"));
    }

    #[tokio::test]
    async fn missing_definition_is_model_not_found() {
        let client = ModelClient::new(Arc::new(ModelConfiguration::default()));
        let err = client
            .chat("acme:missing", ChatRequest::new(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::ModelNotFound { model_id } if model_id == "acme:missing"));
    }

    #[tokio::test]
    async fn missing_factory_is_reported_and_not_cached() {
        let configuration = Arc::new(ModelConfiguration::default());
        configuration
            .models()
            .register_model(ModelDefinition::new("acme", "gpt", ModelType::Chat));
        let client = ModelClient::new(configuration);

        let err = client.resolve_chat("acme:gpt").await.err().unwrap();
        assert!(matches!(err, HubError::NoFactoryForNamespace { namespace } if namespace == "acme"));
        assert_eq!(client.cached_models(), 0);
        assert!(!client.is_model_available("acme:gpt"));
    }

    #[tokio::test]
    async fn kind_mismatch_is_rejected() {
        let configuration = Arc::new(ModelConfiguration::default());
        configuration
            .models()
            .register_model(ModelDefinition::new("acme", "draw", ModelType::Image));
        let client = ModelClient::new(configuration);

        let err = client
            .chat("acme:draw", ChatRequest::new(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HubError::ModelTypeMismatch {
                requested: ModelType::Chat,
                actual: ModelType::Image,
                ..
            }
        ));
    }
}
