use super::*;
use crate::config::EmbeddingConfig;

#[test]
fn client_configuration() {
    let config = EmbeddingConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let config = EmbeddingConfig::default();
    let client = OllamaClient::new(&config)
        .expect("Failed to create client")
        .with_timeout(std::time::Duration::from_secs(60))
        .with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);
}

#[test]
fn embed_request_serialization() {
    let request = EmbedRequest {
        model: "nomic-embed-text:latest",
        input: EmbedInput::Single("hello"),
    };
    let json = serde_json::to_string(&request).expect("should serialize");
    assert_eq!(
        json,
        r#"{"model":"nomic-embed-text:latest","input":"hello"}"#
    );

    let texts = vec!["a".to_string(), "b".to_string()];
    let request = EmbedRequest {
        model: "m",
        input: EmbedInput::Batch(&texts),
    };
    let json = serde_json::to_string(&request).expect("should serialize");
    assert_eq!(json, r#"{"model":"m","input":["a","b"]}"#);
}

#[test]
fn embed_response_parsing() {
    let body = r#"{"model":"m","embeddings":[[0.1,0.2],[0.3,0.4]]}"#;
    let response: EmbedResponse = serde_json::from_str(body).expect("should parse");

    assert_eq!(response.embeddings.len(), 2);
    assert_eq!(response.embeddings[0], vec![0.1, 0.2]);
}
