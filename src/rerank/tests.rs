use super::*;
use crate::config::RerankerConfig;

fn entry(index: usize, score: f32) -> RankedEntry {
    RankedEntry { index, score }
}

#[test]
fn client_configuration() {
    let config = RerankerConfig {
        protocol: "http".to_string(),
        host: "rerank-host".to_string(),
        port: 8087,
    };
    let client = CrossEncoderClient::new(&config).expect("Failed to create client");

    assert_eq!(client.base_url.host_str(), Some("rerank-host"));
    assert_eq!(client.base_url.port(), Some(8087));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);

    let client = client.with_retry_attempts(1);
    assert_eq!(client.retry_attempts, 1);
}

#[test]
fn scores_are_restored_to_input_order() {
    // Server ranks by relevance, not input position.
    let entries = vec![entry(2, 0.9), entry(0, 0.5), entry(1, 0.1)];

    let scores = scores_in_input_order(&entries, 3).expect("should reorder");

    assert_eq!(scores, vec![0.5, 0.1, 0.9]);
}

#[test]
fn score_count_mismatch_is_rejected() {
    let entries = vec![entry(0, 0.5)];
    assert!(scores_in_input_order(&entries, 2).is_err());
}

#[test]
fn out_of_range_index_is_rejected() {
    let entries = vec![entry(0, 0.5), entry(5, 0.9)];
    assert!(scores_in_input_order(&entries, 2).is_err());
}

#[test]
fn duplicate_index_is_rejected() {
    let entries = vec![entry(0, 0.5), entry(0, 0.9)];
    assert!(scores_in_input_order(&entries, 2).is_err());
}

#[test]
fn rerank_response_parsing() {
    let body = r#"[{"index":1,"score":12.25},{"index":0,"score":-4.0}]"#;
    let entries: Vec<RankedEntry> = serde_json::from_str(body).expect("should parse");

    let scores = scores_in_input_order(&entries, 2).expect("should reorder");
    assert_eq!(scores, vec![-4.0, 12.25]);
}

#[test]
fn empty_candidate_list_scores_empty() {
    let config = RerankerConfig::default();
    let client = CrossEncoderClient::new(&config).expect("Failed to create client");

    // No network call happens for an empty candidate list.
    let scores = client.rerank("query", &[]).expect("should score");
    assert!(scores.is_empty());
}
