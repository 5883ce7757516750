// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime model traits implemented by provider plugins.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::HubError;
use crate::model::{
    ChatChunk, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, ImageRequest,
    ImageResponse,
};
use crate::options::ModelOptions;

/// A continuous push of partial chat results.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, HubError>> + Send>>;

/// A chat-completion model.
///
/// `options` is `None` when the caller supplied no raw parameters; the model
/// must then fall back to its own defaults.
#[async_trait]
pub trait ChatModel: Send + Sync + 'static {
    /// Sends a chat request and returns the full response.
    async fn call(
        &self,
        request: ChatRequest,
        options: Option<ModelOptions>,
    ) -> Result<ChatResponse, HubError>;

    /// Sends a chat request and returns a stream of partial results.
    async fn stream(
        &self,
        request: ChatRequest,
        options: Option<ModelOptions>,
    ) -> Result<ChatStream, HubError>;
}

/// An image-generation model.
#[async_trait]
pub trait ImageModel: Send + Sync + 'static {
    async fn generate(
        &self,
        request: ImageRequest,
        options: Option<ModelOptions>,
    ) -> Result<ImageResponse, HubError>;
}

/// A text-embedding model.
#[async_trait]
pub trait EmbeddingModel: Send + Sync + 'static {
    async fn embed(
        &self,
        request: EmbeddingRequest,
        options: Option<ModelOptions>,
    ) -> Result<EmbeddingResponse, HubError>;
}
