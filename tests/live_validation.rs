use std::{env, sync::Once};

use docqa::{
    chat::{ChatRequest, get_chat_client},
    config,
    embedding::get_embedding_client,
    processing::ProcessingService,
};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn init_config_once() {
    INIT.call_once(|| {
        set_default_env("VECTOR_STORE", "qdrant");
        set_default_env("QDRANT_URL", "http://127.0.0.1:6333");
        set_default_env("QDRANT_COLLECTION_NAME", "docqa-live");
        set_default_env("EMBEDDING_PROVIDER", "ollama");
        set_default_env("EMBEDDING_MODEL", "nomic-embed-text");
        set_default_env("EMBEDDING_DIMENSION", "768");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
        set_default_env("CHAT_PROVIDER", "ollama");
        config::init_config();
    });
}

#[tokio::test]
#[ignore = "Requires live Qdrant and Ollama"]
async fn live_service_starts_with_empty_index() {
    init_config_once();
    let service = ProcessingService::new(config::get_config())
        .await
        .expect("service should start against live backends");
    assert_eq!(service.vector_count().await.expect("count"), 0);
    assert!(service.registry_snapshot().await.is_empty());
}

#[tokio::test]
#[ignore = "Requires live Ollama embeddings"]
async fn live_ollama_embedding_roundtrip() {
    init_config_once();
    let config = config::get_config();
    let client = get_embedding_client(config).expect("embedding client");
    let vectors = client
        .generate_embeddings(vec!["docqa live embedding".to_string()])
        .await
        .expect("failed to request embeddings from provider");
    assert_eq!(vectors.len(), 1, "expected embedding per input text");
    assert_eq!(
        vectors[0].len(),
        config.embedding_dimension,
        "embedding dimension mismatch"
    );
}

#[tokio::test]
#[ignore = "Requires live Ollama chat model"]
async fn live_ollama_completion() {
    init_config_once();
    let config = config::get_config();
    let client = get_chat_client(config).expect("chat client");
    let reply = client
        .complete(ChatRequest {
            model: config.chat_model.clone(),
            prompt: "Reply with the single word: ready".into(),
            temperature: Some(0.0),
        })
        .await
        .expect("completion");
    assert!(!reply.is_empty());
}
