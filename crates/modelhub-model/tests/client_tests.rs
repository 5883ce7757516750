// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model dispatch through the caching client.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use modelhub_core::{
    ChatMessage, ChatRequest, EmbeddingRequest, HubError, ImageRequest, ModelDefinition,
    ModelType, Parameters,
};
use modelhub_model::{HandlerKey, ModelClient, ModelConfiguration};
use modelhub_test_utils::{MockFactory, TaggingOptionsHandler};
use serde_json::json;

fn params(value: serde_json::Value) -> Parameters {
    value.as_object().cloned().unwrap_or_default()
}

fn hello() -> ChatRequest {
    ChatRequest::new(vec![ChatMessage::user("hello there")])
}

/// A configuration with `definitions` and one mock factory serving `acme`.
fn setup(
    definitions: Vec<ModelDefinition>,
    factory: MockFactory,
) -> (ModelClient, Arc<MockFactory>) {
    let configuration = Arc::new(ModelConfiguration::default());
    for definition in definitions {
        configuration.models().register_model(definition);
    }
    let factory = Arc::new(factory);
    configuration
        .factories()
        .register_factory("acme".to_string(), factory.clone());
    (ModelClient::new(configuration), factory)
}

#[tokio::test]
async fn chat_without_parameters_passes_no_options() {
    let (client, factory) = setup(
        vec![ModelDefinition::new("acme", "gpt", ModelType::Chat)],
        MockFactory::all(),
    );

    let response = client.chat("acme:gpt", hello()).await.unwrap();

    assert_eq!(response.model, "acme:gpt");
    assert_eq!(response.content, "echo: hello there");
    let invocations = factory.invocations().await;
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].options, None);
}

#[tokio::test]
async fn unknown_model_is_not_found() {
    let (client, factory) = setup(Vec::new(), MockFactory::all());

    let err = client.chat("acme:missing", hello()).await.unwrap_err();

    assert!(matches!(err, HubError::ModelNotFound { model_id } if model_id == "acme:missing"));
    assert_eq!(factory.builds(), 0);
}

#[tokio::test]
async fn model_id_needs_a_namespace_separator() {
    let (client, _) = setup(Vec::new(), MockFactory::all());

    for id in ["gpt", ":gpt", "acme:"] {
        let err = client.chat(id, hello()).await.unwrap_err();
        assert!(matches!(err, HubError::InvalidModelId(_)), "{id}: {err}");
    }
}

#[tokio::test]
async fn namespace_without_factory_is_reported() {
    let (client, _) = setup(
        vec![ModelDefinition::new("orphan", "gpt", ModelType::Chat)],
        MockFactory::all(),
    );

    let err = client.chat("orphan:gpt", hello()).await.unwrap_err();

    assert!(matches!(err, HubError::NoFactoryForNamespace { namespace } if namespace == "orphan"));
    assert!(!client.is_model_available("orphan:gpt"));
}

#[tokio::test]
async fn unsupported_kind_never_reaches_the_factory() {
    let (client, factory) = setup(
        vec![ModelDefinition::new("acme", "painter", ModelType::Image)],
        MockFactory::new(vec![ModelType::Chat]),
    );

    let err = client
        .generate_image("acme:painter", ImageRequest::new("a cat"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HubError::UnsupportedModelType { model_type: ModelType::Image, .. }
    ));
    assert_eq!(factory.builds(), 0);
    assert!(!client.is_model_available("acme:painter"));
}

#[tokio::test]
async fn definition_kind_must_match_the_call() {
    let (client, factory) = setup(
        vec![ModelDefinition::new("acme", "gpt", ModelType::Chat)],
        MockFactory::all(),
    );

    let err = client
        .embedding("acme:gpt", EmbeddingRequest::new(vec!["x".into()]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HubError::ModelTypeMismatch { requested: ModelType::Embedding, actual: ModelType::Chat, .. }
    ));
    assert_eq!(factory.builds(), 0);
}

#[tokio::test]
async fn parameters_without_a_handler_fail_the_call() {
    let (client, factory) = setup(
        vec![ModelDefinition::new("acme", "gpt", ModelType::Chat)],
        MockFactory::all(),
    );

    let request = hello().with_parameters(params(json!({"temperature": 0.3})));
    let err = client.chat("acme:gpt", request).await.unwrap_err();

    assert!(matches!(err, HubError::OptionsHandlerNotFound { model_id } if model_id == "acme:gpt"));
    assert!(factory.invocations().await.is_empty());
}

#[tokio::test]
async fn model_level_handler_beats_namespace_level() {
    let (client, factory) = setup(
        vec![ModelDefinition::new("acme", "gpt", ModelType::Chat)],
        MockFactory::all(),
    );
    let handlers = client.configuration().handlers();
    handlers.register(
        HandlerKey::namespace("acme", ModelType::Chat),
        Arc::new(TaggingOptionsHandler::new("namespace")),
    );
    handlers.register(
        HandlerKey::model("acme", "gpt"),
        Arc::new(TaggingOptionsHandler::new("model")),
    );

    let request = hello().with_parameters(params(json!({"temperature": 0.3})));
    client.chat("acme:gpt", request).await.unwrap();

    let invocations = factory.invocations().await;
    assert_eq!(invocations[0].handled_by().as_deref(), Some("model"));
    let chat = invocations[0].options.as_ref().and_then(|o| o.as_chat()).unwrap();
    assert_eq!(chat.temperature, Some(0.3));
}

#[tokio::test]
async fn named_handler_beats_model_level() {
    let (client, factory) = setup(
        vec![
            ModelDefinition::new("acme", "gpt", ModelType::Chat).with_options_handler("custom"),
            ModelDefinition::new("acme", "fallback", ModelType::Chat)
                .with_options_handler("not-registered"),
        ],
        MockFactory::all(),
    );
    let handlers = client.configuration().handlers();
    handlers.register(
        HandlerKey::named("custom"),
        Arc::new(TaggingOptionsHandler::new("named")),
    );
    handlers.register(
        HandlerKey::model("acme", "gpt"),
        Arc::new(TaggingOptionsHandler::new("model")),
    );
    handlers.register(
        HandlerKey::namespace("acme", ModelType::Chat),
        Arc::new(TaggingOptionsHandler::new("namespace")),
    );

    let parameters = params(json!({"max_tokens": 64}));
    client
        .chat("acme:gpt", hello().with_parameters(parameters.clone()))
        .await
        .unwrap();
    client
        .chat("acme:fallback", hello().with_parameters(parameters))
        .await
        .unwrap();

    let tags: Vec<Option<String>> = factory
        .invocations()
        .await
        .iter()
        .map(|i| i.handled_by())
        .collect();
    // An unregistered named handler falls through to the next tier.
    assert_eq!(tags, vec![Some("named".into()), Some("namespace".into())]);
}

#[tokio::test]
async fn builtin_handler_merges_definition_defaults() {
    let definition = ModelDefinition::new("acme", "painter", ModelType::Image)
        .with_options_handler("image")
        .with_option("quality", json!("hd"))
        .with_option("n", json!(1));
    let (client, factory) = setup(vec![definition], MockFactory::all());

    let request = ImageRequest::new("a lighthouse").with_parameters(params(json!({"n": 2})));
    let response = client.generate_image("acme:painter", request).await.unwrap();

    assert_eq!(response.images.len(), 2);
    let invocations = factory.invocations().await;
    let image = invocations[0].options.as_ref().and_then(|o| o.as_image()).unwrap();
    assert_eq!(image.n, Some(2));
    assert_eq!(image.quality.as_deref(), Some("hd"));
    assert_eq!(image.model.as_deref(), Some("painter"));
}

#[tokio::test]
async fn embedding_uses_namespace_handler() {
    let (client, _) = setup(
        vec![ModelDefinition::new("acme", "embed", ModelType::Embedding)],
        MockFactory::all(),
    );
    client.configuration().handlers().register(
        HandlerKey::namespace("acme", ModelType::Embedding),
        Arc::new(TaggingOptionsHandler::new("namespace")),
    );

    let request = EmbeddingRequest::new(vec!["one".into(), "three".into()])
        .with_parameters(params(json!({"dimensions": 4})));
    let response = client.embedding("acme:embed", request).await.unwrap();

    assert_eq!(response.embeddings, vec![vec![3.0; 4], vec![5.0; 4]]);
}

#[tokio::test]
async fn chat_stream_forwards_partial_results() {
    let (client, _) = setup(
        vec![ModelDefinition::new("acme", "gpt", ModelType::Chat)],
        MockFactory::all(),
    );

    let stream = client.chat_stream("acme:gpt", hello()).await.unwrap();
    let chunks: Vec<_> = stream.collect().await;

    let text: String = chunks
        .iter()
        .map(|c| c.as_ref().unwrap().delta.clone())
        .collect();
    assert_eq!(text, "hello there");
    let last = chunks.last().unwrap().as_ref().unwrap();
    assert_eq!(last.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn repeated_calls_reuse_the_cached_model() {
    let (client, factory) = setup(
        vec![ModelDefinition::new("acme", "gpt", ModelType::Chat)],
        MockFactory::all(),
    );

    for _ in 0..3 {
        client.chat("acme:gpt", hello()).await.unwrap();
    }

    assert_eq!(factory.builds(), 1);
    assert_eq!(client.cached_models(), 1);
}

#[tokio::test]
async fn failed_build_is_not_cached() {
    let (client, factory) = setup(
        vec![ModelDefinition::new("acme", "gpt", ModelType::Chat)],
        MockFactory::all(),
    );
    let configuration = Arc::clone(client.configuration());
    configuration.factories().unregister_factory("acme");

    assert!(client.resolve_chat("acme:gpt").await.is_err());
    assert_eq!(client.cached_models(), 0);

    configuration
        .factories()
        .register_factory("acme".to_string(), factory.clone());
    client.resolve_chat("acme:gpt").await.unwrap();
    assert_eq!(factory.builds(), 1);
}

#[tokio::test]
async fn close_drops_cached_models() {
    let (client, factory) = setup(
        vec![ModelDefinition::new("acme", "gpt", ModelType::Chat)],
        MockFactory::all(),
    );

    let before = client.resolve_chat("acme:gpt").await.unwrap();
    client.close();
    assert_eq!(client.cached_models(), 0);
    let after = client.resolve_chat("acme:gpt").await.unwrap();

    assert_eq!(factory.builds(), 2);
    assert_ne!(
        Arc::as_ptr(&before) as *const (),
        Arc::as_ptr(&after) as *const ()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_first_calls_construct_once() {
    let (client, factory) = setup(
        vec![ModelDefinition::new("acme", "gpt", ModelType::Chat)],
        MockFactory::all().with_build_delay(Duration::from_millis(50)),
    );
    let client = Arc::new(client);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.resolve_chat("acme:gpt").await })
        })
        .collect();
    let mut models = Vec::new();
    for task in tasks {
        models.push(task.await.unwrap().unwrap());
    }

    assert_eq!(factory.builds(), 1);
    let first = Arc::as_ptr(&models[0]) as *const ();
    assert!(models.iter().all(|m| Arc::as_ptr(m) as *const () == first));
}
