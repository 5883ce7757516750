// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock runtime models and the factory that builds them.
//!
//! Every model built by a [`MockFactory`] echoes its input and records the
//! options it was invoked with, so tests can assert which options handler
//! produced them.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use modelhub_core::{
    ChatChunk, ChatModel, ChatRequest, ChatResponse, ChatRole, ChatStream, EmbeddingModel,
    EmbeddingRequest, EmbeddingResponse, GeneratedImage, HubError, ImageModel, ImageRequest,
    ImageResponse, ModelDefinition, ModelOptions, ModelType, OptionsHandler, Parameters,
    TokenUsage,
};
use modelhub_model::{ModelConfiguration, ModelFactory};
use serde_json::Value;
use tokio::sync::Mutex;

/// One call made against a mock model.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub model_id: String,
    pub model_type: ModelType,
    pub options: Option<ModelOptions>,
}

impl Invocation {
    /// The `handled_by` tag a [`TaggingOptionsHandler`] left in the options.
    pub fn handled_by(&self) -> Option<String> {
        let extra = match self.options.as_ref()? {
            ModelOptions::Chat(options) => &options.extra,
            ModelOptions::Image(options) => &options.extra,
            ModelOptions::Embedding(options) => &options.extra,
        };
        extra
            .get("handled_by")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

type InvocationLog = Arc<Mutex<Vec<Invocation>>>;

struct EchoModel {
    model_id: String,
    invocations: InvocationLog,
}

impl EchoModel {
    async fn record(&self, model_type: ModelType, options: Option<ModelOptions>) {
        self.invocations.lock().await.push(Invocation {
            model_id: self.model_id.clone(),
            model_type,
            options,
        });
    }
}

fn last_user_message(request: &ChatRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == ChatRole::User)
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

#[async_trait]
impl ChatModel for EchoModel {
    async fn call(
        &self,
        request: ChatRequest,
        options: Option<ModelOptions>,
    ) -> Result<ChatResponse, HubError> {
        self.record(ModelType::Chat, options).await;
        let content = format!("echo: {}", last_user_message(&request));
        Ok(ChatResponse {
            model: self.model_id.clone(),
            content,
            finish_reason: Some("stop".to_string()),
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            }),
        })
    }

    async fn stream(
        &self,
        request: ChatRequest,
        options: Option<ModelOptions>,
    ) -> Result<ChatStream, HubError> {
        self.record(ModelType::Chat, options).await;
        let text = last_user_message(&request);
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        let last = words.len().saturating_sub(1);
        let chunks: Vec<Result<ChatChunk, HubError>> = words
            .into_iter()
            .enumerate()
            .map(|(i, word)| {
                Ok(ChatChunk {
                    delta: if i == 0 { word } else { format!(" {word}") },
                    finish_reason: (i == last).then(|| "stop".to_string()),
                    usage: None,
                })
            })
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

#[async_trait]
impl ImageModel for EchoModel {
    async fn generate(
        &self,
        request: ImageRequest,
        options: Option<ModelOptions>,
    ) -> Result<ImageResponse, HubError> {
        let count = options
            .as_ref()
            .and_then(ModelOptions::as_image)
            .and_then(|o| o.n)
            .unwrap_or(1);
        self.record(ModelType::Image, options).await;
        let images = (0..count)
            .map(|i| GeneratedImage {
                url: Some(format!("mock://{}/{i}?prompt={}", self.model_id, request.prompt)),
                b64_json: None,
            })
            .collect();
        Ok(ImageResponse {
            model: self.model_id.clone(),
            images,
        })
    }
}

#[async_trait]
impl EmbeddingModel for EchoModel {
    async fn embed(
        &self,
        request: EmbeddingRequest,
        options: Option<ModelOptions>,
    ) -> Result<EmbeddingResponse, HubError> {
        let dimensions = options
            .as_ref()
            .and_then(ModelOptions::as_embedding)
            .and_then(|o| o.dimensions)
            .unwrap_or(3) as usize;
        self.record(ModelType::Embedding, options).await;
        let embeddings = request
            .inputs
            .iter()
            .map(|input| vec![input.len() as f32; dimensions])
            .collect();
        Ok(EmbeddingResponse {
            model: self.model_id.clone(),
            embeddings,
            usage: None,
        })
    }
}

/// A factory that builds echo models for the kinds it was told to support.
///
/// Counts every successful build, so tests can assert that the client cache
/// constructed a model exactly once.
pub struct MockFactory {
    supported: Vec<ModelType>,
    builds: AtomicUsize,
    build_delay: Option<Duration>,
    invocations: InvocationLog,
}

impl MockFactory {
    pub fn new(supported: impl Into<Vec<ModelType>>) -> Self {
        Self {
            supported: supported.into(),
            builds: AtomicUsize::new(0),
            build_delay: None,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A factory supporting chat, image and embedding models.
    pub fn all() -> Self {
        Self::new(vec![ModelType::Chat, ModelType::Image, ModelType::Embedding])
    }

    /// Blocks each build for `delay`, widening the window for racing callers.
    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = Some(delay);
        self
    }

    /// Number of models built so far.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Every invocation made against models this factory built, in order.
    pub async fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().await.clone()
    }

    fn build(&self, definition: &ModelDefinition) -> Arc<EchoModel> {
        if let Some(delay) = self.build_delay {
            std::thread::sleep(delay);
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        Arc::new(EchoModel {
            model_id: definition.model_id(),
            invocations: Arc::clone(&self.invocations),
        })
    }
}

impl Default for MockFactory {
    fn default() -> Self {
        Self::all()
    }
}

impl ModelFactory for MockFactory {
    fn supports(&self, model_type: ModelType) -> bool {
        self.supported.contains(&model_type)
    }

    fn create_chat_model(
        &self,
        definition: &ModelDefinition,
        _configuration: &ModelConfiguration,
    ) -> Result<Arc<dyn ChatModel>, HubError> {
        Ok(self.build(definition))
    }

    fn create_image_model(
        &self,
        definition: &ModelDefinition,
        _configuration: &ModelConfiguration,
    ) -> Result<Arc<dyn ImageModel>, HubError> {
        Ok(self.build(definition))
    }

    fn create_embedding_model(
        &self,
        definition: &ModelDefinition,
        _configuration: &ModelConfiguration,
    ) -> Result<Arc<dyn EmbeddingModel>, HubError> {
        Ok(self.build(definition))
    }
}

/// An options handler that converts parameters like the built-in handlers
/// and tags the result with its own name under `handled_by`.
#[derive(Debug, Clone)]
pub struct TaggingOptionsHandler {
    name: String,
}

impl TaggingOptionsHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl OptionsHandler for TaggingOptionsHandler {
    fn build_options(
        &self,
        definition: &ModelDefinition,
        parameters: &Parameters,
    ) -> Result<ModelOptions, HubError> {
        let mut tagged = parameters.clone();
        tagged.insert("handled_by".to_string(), Value::String(self.name.clone()));
        ModelOptions::from_parameters(definition.model_type, &tagged)
    }
}
