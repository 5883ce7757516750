// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider entry points compiled into the binary.
//!
//! A plugin package selects one of these through its descriptor's `entry`
//! field. `builtin.echo` serves the `echo` namespace with a chat model that
//! repeats the last user message and a deterministic embedding model, which
//! is enough to exercise the full install/enable/dispatch path offline.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use modelhub_core::{
    ChatChunk, ChatModel, ChatRequest, ChatResponse, ChatRole, ChatStream, EmbeddingModel,
    EmbeddingRequest, EmbeddingResponse, HubError, ModelDefinition, ModelOptions, ModelType,
    TokenUsage,
};
use modelhub_model::{ModelConfiguration, ModelFactory};
use modelhub_plugin::{PluginContext, ProviderPlugin, StaticEntryPoints};

pub const ECHO_ENTRY: &str = "builtin.echo";

const NAMESPACE: &str = "echo";
const DEFAULT_DIMENSIONS: u32 = 8;

/// Registers every built-in provider constructor.
pub fn register(entries: &StaticEntryPoints) {
    entries.register(ECHO_ENTRY, || {
        Ok(Arc::new(EchoProvider) as Arc<dyn ProviderPlugin>)
    });
}

struct EchoProvider;

#[async_trait]
impl ProviderPlugin for EchoProvider {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    async fn initialize(&self, context: &PluginContext) -> Result<(), HubError> {
        context.log().info("echo provider ready");
        Ok(())
    }

    fn factory(&self) -> Arc<dyn ModelFactory> {
        Arc::new(EchoFactory)
    }

    fn models(&self) -> Result<Vec<ModelDefinition>, HubError> {
        Ok(vec![
            ModelDefinition::new(NAMESPACE, "chat", ModelType::Chat).with_options_handler("chat"),
            ModelDefinition::new(NAMESPACE, "embed", ModelType::Embedding)
                .with_options_handler("embedding"),
        ])
    }
}

struct EchoFactory;

impl ModelFactory for EchoFactory {
    fn supports(&self, model_type: ModelType) -> bool {
        matches!(model_type, ModelType::Chat | ModelType::Embedding)
    }

    fn create_chat_model(
        &self,
        definition: &ModelDefinition,
        _configuration: &ModelConfiguration,
    ) -> Result<Arc<dyn ChatModel>, HubError> {
        Ok(Arc::new(EchoModel {
            model_id: definition.model_id(),
        }))
    }

    fn create_embedding_model(
        &self,
        definition: &ModelDefinition,
        _configuration: &ModelConfiguration,
    ) -> Result<Arc<dyn EmbeddingModel>, HubError> {
        Ok(Arc::new(EchoModel {
            model_id: definition.model_id(),
        }))
    }
}

struct EchoModel {
    model_id: String,
}

fn echoed(request: &ChatRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == ChatRole::User)
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

/// Truncates to `max_tokens` whitespace-separated words when set.
fn limited(text: String, options: Option<&ModelOptions>) -> String {
    match options.and_then(ModelOptions::as_chat).and_then(|o| o.max_tokens) {
        Some(max) => text
            .split_whitespace()
            .take(max as usize)
            .collect::<Vec<_>>()
            .join(" "),
        None => text,
    }
}

#[async_trait]
impl ChatModel for EchoModel {
    async fn call(
        &self,
        request: ChatRequest,
        options: Option<ModelOptions>,
    ) -> Result<ChatResponse, HubError> {
        let input = echoed(&request);
        let content = limited(input.clone(), options.as_ref());
        Ok(ChatResponse {
            model: self.model_id.clone(),
            usage: Some(TokenUsage {
                input_tokens: input.split_whitespace().count() as u32,
                output_tokens: content.split_whitespace().count() as u32,
            }),
            content,
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn stream(
        &self,
        request: ChatRequest,
        options: Option<ModelOptions>,
    ) -> Result<ChatStream, HubError> {
        let content = limited(echoed(&request), options.as_ref());
        let words: Vec<String> = content.split_whitespace().map(str::to_string).collect();
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
            .unwrap_or(DEFAULT_DIMENSIONS)
            .max(1) as usize;
        let embeddings = request
            .inputs
            .iter()
            .map(|input| fold_bytes(input, dimensions))
            .collect();
        Ok(EmbeddingResponse {
            model: self.model_id.clone(),
            embeddings,
            usage: None,
        })
    }
}

/// Folds the input bytes into `dimensions` buckets, scaled to [0, 1].
fn fold_bytes(input: &str, dimensions: usize) -> Vec<f32> {
    let mut buckets = vec![0f32; dimensions];
    for (i, byte) in input.bytes().enumerate() {
        buckets[i % dimensions] += f32::from(byte);
    }
    let max = buckets.iter().copied().fold(0f32, f32::max);
    if max > 0.0 {
        for value in &mut buckets {
            *value /= max;
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelhub_core::{ChatMessage, PluginRecord, PluginStatus, PluginType};
    use modelhub_model::ModelClient;
    use modelhub_plugin::{
        EntryPointLoader, MemoryConfigStore, ModelPluginAdapter, PluginAdapter,
        PluginContextFactory,
    };

    fn record() -> PluginRecord {
        let now = chrono::Utc::now();
        PluginRecord {
            plugin_id: "echo".into(),
            name: "Echo".into(),
            version: "1.0.0".into(),
            plugin_type: PluginType::Model,
            status: PluginStatus::Enabling,
            package_path: None,
            main_entry: ECHO_ENTRY.into(),
            icon_path: None,
            checksum: None,
            installed_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn folded_embedding_is_normalized() {
        let v = fold_bytes("hello world", 4);
        assert_eq!(v.len(), 4);
        assert!(v.iter().all(|x| (0.0..=1.0).contains(x)));
        assert!(v.contains(&1.0));
        assert_eq!(fold_bytes("", 3), vec![0.0; 3]);
    }

    #[tokio::test]
    async fn echo_entry_serves_chat_through_the_client() {
        let dir = tempfile::tempdir().unwrap();
        let entries = Arc::new(StaticEntryPoints::new());
        register(&entries);
        assert!(entries.load(&record()).await.is_ok());

        let configuration = Arc::new(ModelConfiguration::default());
        let adapter = ModelPluginAdapter::new(
            Arc::clone(&configuration),
            entries,
            PluginContextFactory::new(dir.path(), Arc::new(MemoryConfigStore::new())),
        );
        adapter.on_enable(&record()).await.unwrap();

        let client = ModelClient::new(configuration);
        let response = client
            .chat(
                "echo:chat",
                ChatRequest::new(vec![ChatMessage::user("one two three")]),
            )
            .await
            .unwrap();
        assert_eq!(response.content, "one two three");
        assert!(client.is_model_available("echo:embed"));
    }
}
